use serde::Serialize;

pub const PENDING_TITLE: &str = "Pending changes";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Raw `key: value` fields of one log record, in the order they were printed.
/// Repeated keys accumulate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogFields(Vec<(String, Vec<String>)>);

impl LogFields {
    pub fn push(&mut self, key: &str, value: String) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.0.push((key.to_string(), vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Changeset {
    /// Short hash; `None` is the synthetic working-copy changeset.
    pub rev: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub summary: String,
    pub fields: LogFields,
    /// Declared parent revisions, null revision already removed.
    pub parents: Vec<String>,
    /// Positions in the fetched history window, filled by `hierarchy::link`.
    pub parent_revs: Vec<usize>,
    pub child_revs: Vec<usize>,
    pub current: bool,
}

impl Changeset {
    pub fn pending() -> Self {
        Self {
            title: Some(PENDING_TITLE.to_string()),
            ..Self::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.rev.is_none()
    }

    pub fn date(&self) -> Option<&str> {
        self.fields.get("date")
    }

    pub fn branch(&self) -> Option<&str> {
        self.fields.get("branch")
    }

    pub fn phase(&self) -> Option<&str> {
        self.fields.get("phase")
    }

    pub fn user(&self) -> Option<&str> {
        self.fields.get("user")
    }

    pub fn bookmarks(&self) -> &[String] {
        self.fields.get_all("bookmark")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub status: char,
    /// Revision whose changes this file shows; `None` diffs the working copy.
    pub rev: Option<String>,
    /// `diff --git` preamble lines, known once the diff has been fetched.
    pub header: Vec<String>,
}

impl FileEntry {
    pub fn new(status: char, path: impl Into<String>, rev: Option<String>) -> Self {
        Self {
            path: path.into(),
            status,
            rev,
            header: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Hunk {
    /// Raw diff lines, the first one being the `@@ ... @@` header.
    pub lines: Vec<String>,
}

impl Hunk {
    pub fn range(&self) -> Option<HunkRange> {
        parse_hunk_header(self.lines.first()?)
    }

    /// New-file line number of each line; `None` for the header and removals.
    pub fn new_line_numbers(&self) -> Vec<Option<u32>> {
        let mut next = self.range().map(|r| r.new_start).unwrap_or(1);
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 || line.starts_with('-') || line.starts_with('\\') {
                    return None;
                }
                let n = next;
                next += 1;
                Some(n)
            })
            .collect()
    }
}

fn parse_hunk_header(line: &str) -> Option<HunkRange> {
    let rest = line.trim().strip_prefix("@@")?;
    let (ranges, _) = rest.split_once("@@")?;
    let mut it = ranges.split_whitespace();
    let (old_start, old_len) = parse_range(it.next()?.strip_prefix('-')?)?;
    let (new_start, new_len) = parse_range(it.next()?.strip_prefix('+')?)?;
    Some(HunkRange {
        old_start,
        old_len,
        new_start,
        new_len,
    })
}

fn parse_range(s: &str) -> Option<(u32, u32)> {
    match s.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Shelve {
    pub name: String,
    pub age: String,
    pub message: String,
}

/// Text of a row, one entry per screen line.
pub trait RowText {
    fn row_lines(&self) -> Vec<String>;
}

impl RowText for Changeset {
    fn row_lines(&self) -> Vec<String> {
        if let Some(title) = &self.title {
            return vec![title.clone()];
        }
        let mut out = String::new();
        out.push(if self.current { '@' } else { 'o' });
        out.push(' ');
        out.push_str(self.rev.as_deref().unwrap_or("?"));
        for tag in &self.tags {
            out.push_str(&format!(" [{}]", tag));
        }
        for bookmark in self.bookmarks() {
            out.push_str(&format!(" <{}>", bookmark));
        }
        if !self.summary.is_empty() {
            out.push(' ');
            out.push_str(&self.summary);
        }
        vec![out]
    }
}

impl RowText for FileEntry {
    fn row_lines(&self) -> Vec<String> {
        vec![format!("{} {}", self.status, self.path)]
    }
}

impl RowText for Hunk {
    fn row_lines(&self) -> Vec<String> {
        self.lines.clone()
    }
}

impl RowText for Shelve {
    fn row_lines(&self) -> Vec<String> {
        vec![format!("{} ({}) {}", self.name, self.age, self.message)]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Changeset(Changeset),
    File(FileEntry),
    Hunk(Hunk),
    Shelve(Shelve),
}

impl Entity {
    pub fn is_expandable(&self) -> bool {
        !matches!(self, Entity::Hunk(_))
    }

    pub fn row_lines(&self) -> Vec<String> {
        match self {
            Entity::Changeset(c) => c.row_lines(),
            Entity::File(f) => f.row_lines(),
            Entity::Hunk(h) => h.row_lines(),
            Entity::Shelve(s) => s.row_lines(),
        }
    }

    pub fn as_changeset(&self) -> Option<&Changeset> {
        match self {
            Entity::Changeset(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entity::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_hunk(&self) -> Option<&Hunk> {
        match self {
            Entity::Hunk(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_shelve(&self) -> Option<&Shelve> {
        match self {
            Entity::Shelve(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub expanded: bool,
    /// `None` until the children have been fetched.
    pub children: Option<Vec<NodeId>>,
    pub entity: Entity,
}

/// Owns every entity of one population. Handles stay valid until `clear`.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn insert(&mut self, entity: Entity, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            expanded: false,
            children: None,
            entity,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Number of ancestors between `id` and its top-level node.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            depth += 1;
            cur = self.parent(p);
        }
        depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
