#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use hgtree::process::CommandRunner;
use hgtree::vcs::CommandSpec;

pub const LOG: &str = "\
changeset: c3
summary: third
date: 2021-01-02 10:00 +0000
branch: default
phase: draft
parent: c2
parent: 000000000000
tag: tip
changeset: c2
summary: second
date: 2021-01-01 10:00 +0000
branch: default
phase: public
parent: 000000000000
parent: 000000000000
";

pub const SHELVES: &str = "wip             (1h ago)    changes to: third\n";

pub const SHELVE_PATCH: &str = "\
wip             (1h ago)    changes to: third
diff --git a/s.txt b/s.txt
--- a/s.txt
+++ b/s.txt
@@ -1,1 +1,1 @@
-old
+new
";

pub fn file_diff(path: &str) -> String {
    format!(
        "diff --git a/{p} b/{p}\n--- a/{p}\n+++ b/{p}\n@@ -1,2 +1,2 @@\n-one\n+uno\n two\n@@ -9,1 +9,2 @@\n nine\n+ten\n",
        p = path
    )
}

/// Answers `hg` invocations the way a small two-changeset repository would.
pub fn canned_hg(spec: &CommandSpec) -> String {
    let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["log", "-r", "parents()", ..] => "c2\n".to_string(),
        ["log", ..] => LOG.to_string(),
        ["status", "--change", "."] => "A b.txt\n".to_string(),
        ["status", "--change", rev] => format!("M {}.txt\n", rev),
        ["status"] => "M a.txt\n? notes.txt\n".to_string(),
        [.., "shelve", "--list"] => SHELVES.to_string(),
        [.., "shelve", "--patch", "--", _] => SHELVE_PATCH.to_string(),
        ["diff", .., last] => file_diff(last.trim_start_matches("path:")),
        _ => String::new(),
    }
}

type Respond = Box<dyn Fn(&CommandSpec) -> String + Send + Sync>;

/// Records every command line instead of spawning it.
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    respond: Respond,
}

impl FakeRunner {
    pub fn new(respond: impl Fn(&CommandSpec) -> String + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn hg() -> Self {
        Self::new(canned_hg)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec, _cwd: &Path) -> hgtree::Result<String> {
        self.calls.lock().unwrap().push(spec.args.join(" "));
        Ok((self.respond)(spec))
    }
}
