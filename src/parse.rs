//! Turns raw `hg` output into entity records.
//!
//! Every parser here is total: lines that do not match the expected shape
//! are skipped, so error text printed by the tool yields empty results
//! rather than a failure.

use crate::model::{Changeset, FileEntry, Hunk, LogFields, Shelve};

/// Removes terminal colour and cursor escape sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                // CSI: parameters and intermediates, then one final byte.
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }
    out
}

/// True for the all-zero revision the tool prints for a missing parent.
pub fn is_null_revision(rev: &str) -> bool {
    !rev.is_empty() && rev.bytes().all(|b| b == b'0')
}

pub fn parse_changesets(text: &str) -> Vec<Changeset> {
    let mut out = Vec::new();
    let mut current: Option<Changeset> = None;

    for raw in text.lines() {
        let line = raw.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key == "changeset" {
            if let Some(done) = current.take() {
                out.push(done);
            }
            if value.is_empty() || is_null_revision(value) {
                continue;
            }
            let mut fields = LogFields::default();
            fields.push(key, value.to_string());
            current = Some(Changeset {
                rev: Some(value.to_string()),
                fields,
                ..Changeset::default()
            });
            continue;
        }

        // Anything before the first record is preamble.
        let Some(cs) = current.as_mut() else {
            continue;
        };
        if key.is_empty() || key.contains(char::is_whitespace) {
            continue;
        }

        match key {
            "parent" => {
                if !value.is_empty() && !is_null_revision(value) {
                    cs.parents.push(value.to_string());
                }
            }
            "tag" => {
                if !value.is_empty() {
                    cs.tags.push(value.to_string());
                }
            }
            "summary" => cs.summary = value.to_string(),
            _ => {}
        }
        cs.fields.push(key, value.to_string());
    }

    if let Some(done) = current {
        out.push(done);
    }
    out
}

pub fn parse_status_files(text: &str, rev: Option<&str>) -> Vec<FileEntry> {
    strip_ansi(text)
        .lines()
        .filter_map(|line| {
            let mut chars = line.chars();
            let status = chars.next()?;
            if status.is_whitespace() || chars.next()? != ' ' {
                return None;
            }
            let path = chars.as_str();
            if path.trim().is_empty() {
                return None;
            }
            Some(FileEntry::new(status, path, rev.map(str::to_string)))
        })
        .collect()
}

/// Short revision ids, one per line.
pub fn parse_revisions(text: &str) -> Vec<String> {
    strip_ansi(text)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_hexdigit()))
        .filter(|l| !is_null_revision(l))
        .map(str::to_string)
        .collect()
}

/// One file's section of a unified diff.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub header: Vec<String>,
    pub hunks: Vec<Hunk>,
}

fn is_hunk_body(line: &str) -> bool {
    line.is_empty()
        || line.starts_with(' ')
        || line.starts_with('+')
        || line.starts_with('-')
        || line.starts_with('\\')
}

pub fn parse_file_diff(text: &str) -> FileDiff {
    let clean = strip_ansi(text);
    let mut diff = FileDiff::default();
    let mut hunk: Option<Vec<String>> = None;

    for line in clean.lines() {
        if line.starts_with("@@") {
            if let Some(lines) = hunk.take() {
                diff.hunks.push(Hunk { lines });
            }
            hunk = Some(vec![line.to_string()]);
            continue;
        }
        match hunk.as_mut() {
            Some(lines) if is_hunk_body(line) => lines.push(line.to_string()),
            Some(_) => {
                // Trailing noise after the last hunk ends it.
                if let Some(lines) = hunk.take() {
                    diff.hunks.push(Hunk { lines });
                }
            }
            None if diff.hunks.is_empty() => diff.header.push(line.to_string()),
            None => {}
        }
    }
    if let Some(lines) = hunk {
        diff.hunks.push(Hunk { lines });
    }

    // A blank separator line is not part of the hunk.
    for h in &mut diff.hunks {
        while h.lines.len() > 1 && h.lines.last().is_some_and(|l| l.is_empty()) {
            h.lines.pop();
        }
    }
    diff
}

pub fn parse_diff(text: &str) -> Vec<Hunk> {
    parse_file_diff(text).hunks
}

pub fn parse_shelve_list(text: &str) -> Vec<Shelve> {
    strip_ansi(text)
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let (name, rest) = line.split_once(char::is_whitespace)?;
            let rest = rest.trim_start().strip_prefix('(')?;
            let (age, message) = rest.split_once(')')?;
            if name.is_empty() || age.trim().is_empty() {
                return None;
            }
            Some(Shelve {
                name: name.to_string(),
                age: age.trim().to_string(),
                message: message.trim().to_string(),
            })
        })
        .collect()
}

/// A file of a shelve, with its diff already split into hunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShelvedFile {
    pub file: FileEntry,
    pub hunks: Vec<Hunk>,
}

pub fn parse_shelve_diff(text: &str) -> Vec<ShelvedFile> {
    let clean = strip_ansi(text);
    let mut fragments: Vec<Vec<&str>> = Vec::new();
    for line in clean.lines() {
        if line.starts_with("diff ") {
            fragments.push(vec![line]);
        } else if let Some(frag) = fragments.last_mut() {
            frag.push(line);
        }
    }

    fragments
        .into_iter()
        .filter_map(|frag| {
            let path = fragment_path(&frag)?;
            let status = fragment_status(&frag);
            let diff = parse_file_diff(&frag.join("\n"));
            let mut file = FileEntry::new(status, path, None);
            file.header = diff.header;
            Some(ShelvedFile {
                file,
                hunks: diff.hunks,
            })
        })
        .collect()
}

fn fragment_path(frag: &[&str]) -> Option<String> {
    let first = frag.first()?;
    if let Some(rest) = first.strip_prefix("diff --git ") {
        if let Some(idx) = rest.find(" b/") {
            return Some(rest[idx + 3..].to_string());
        }
    }
    for line in frag {
        for prefix in ["+++ b/", "--- a/"] {
            if let Some(path) = line.strip_prefix(prefix) {
                return Some(path.split('\t').next().unwrap_or(path).to_string());
            }
        }
    }
    None
}

fn fragment_status(frag: &[&str]) -> char {
    for line in frag {
        if line.starts_with("@@") {
            break;
        }
        if line.starts_with("new file mode") {
            return 'A';
        }
        if line.starts_with("deleted file mode") {
            return 'R';
        }
    }
    'M'
}
