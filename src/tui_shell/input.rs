/// Single-line edit buffer. `cursor` is a byte offset on a char boundary.
#[derive(Debug, Default)]
pub(super) struct Input {
    pub(super) buf: String,
    pub(super) cursor: usize,
}

impl Input {
    pub(super) fn insert_char(&mut self, c: char) {
        self.buf.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub(super) fn backspace(&mut self) {
        let Some(c) = self.buf[..self.cursor].chars().next_back() else {
            return;
        };
        self.cursor -= c.len_utf8();
        self.buf.remove(self.cursor);
    }

    pub(super) fn delete(&mut self) {
        if self.cursor >= self.buf.len() {
            return;
        }
        self.buf.remove(self.cursor);
    }

    pub(super) fn move_left(&mut self) {
        if let Some(c) = self.buf[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub(super) fn move_right(&mut self) {
        if let Some(c) = self.buf[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub(super) fn home(&mut self) {
        self.cursor = 0;
    }

    pub(super) fn end(&mut self) {
        self.cursor = self.buf.len();
    }

    pub(super) fn set(&mut self, s: String) {
        self.buf = s;
        self.cursor = self.buf.len();
    }

    /// Display column of the cursor.
    pub(super) fn column(&self) -> usize {
        self.buf[..self.cursor].chars().count()
    }
}
