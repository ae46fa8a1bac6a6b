//! Command lines for every query and mutation issued against `hg` and `patch`.

use std::fmt;
use std::path::Path;

use crate::config::Config;

/// Per-changeset record shape understood by `parse::parse_changesets`.
///
/// Both parents are always printed; the null revision stands in for a
/// missing one and is dropped by the parser.
pub const LOG_TEMPLATE: &str = concat!(
    "changeset: {node|short}\n",
    "summary: {desc|firstline}\n",
    "date: {date|isodate}\n",
    "user: {author|user}\n",
    "branch: {branch}\n",
    "phase: {phase}\n",
    "parent: {p1node|short}\n",
    "parent: {p2node|short}\n",
    "{tags % \"tag: {tag}\\n\"}",
    "{bookmarks % \"bookmark: {bookmark}\\n\"}",
);

pub const PARENTS_TEMPLATE: &str = "{node|short}\\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, " {:?}", a)?;
            } else {
                write!(f, " {}", a)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Public,
    Draft,
    Secret,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Public => "public",
            Phase::Draft => "draft",
            Phase::Secret => "secret",
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Phase::Public),
            "draft" => Ok(Phase::Draft),
            "secret" => Ok(Phase::Secret),
            other => Err(format!("unknown phase '{}' (public, draft, secret)", other)),
        }
    }
}

/// Builds command specs from the configured executables and log query.
#[derive(Clone, Debug)]
pub struct Vcs {
    hg: String,
    patch: String,
    revset: String,
    limit: usize,
}

impl Vcs {
    pub fn new(cfg: &Config) -> Self {
        Self {
            hg: cfg.hg.clone(),
            patch: cfg.patch.clone(),
            revset: cfg.revset.clone(),
            limit: cfg.limit,
        }
    }

    fn hg<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // HGPLAIN pins the output format and disables pagers and colour.
        CommandSpec::new(&self.hg, args).env("HGPLAIN", "1")
    }

    fn with_extension(&self, ext: &str, args: &[&str]) -> CommandSpec {
        let mut all = vec!["--config".to_string(), format!("extensions.{}=", ext)];
        all.extend(args.iter().map(|s| s.to_string()));
        self.hg(all)
    }

    pub fn log(&self) -> CommandSpec {
        self.hg([
            "log".to_string(),
            "-r".to_string(),
            self.revset.clone(),
            "-l".to_string(),
            self.limit.to_string(),
            "-T".to_string(),
            LOG_TEMPLATE.to_string(),
        ])
    }

    /// Working copy against its parent.
    pub fn pending_status(&self) -> CommandSpec {
        self.status(None)
    }

    /// Files touched by the working copy's parent itself.
    pub fn current_status(&self) -> CommandSpec {
        self.hg(["status", "--change", "."])
    }

    pub fn current_parents(&self) -> CommandSpec {
        self.hg(["log", "-r", "parents()", "-T", PARENTS_TEMPLATE])
    }

    pub fn shelve_list(&self) -> CommandSpec {
        self.with_extension("shelve", &["shelve", "--list"])
    }

    /// The refresh round; result positions are fixed (see `tree::RefreshOutputs`).
    pub fn refresh_specs(&self) -> Vec<CommandSpec> {
        vec![
            self.log(),
            self.pending_status(),
            self.current_status(),
            self.current_parents(),
            self.shelve_list(),
        ]
    }

    pub fn status(&self, rev: Option<&str>) -> CommandSpec {
        match rev {
            Some(rev) => self.hg(["status", "--change", rev]),
            None => self.hg(["status"]),
        }
    }

    pub fn diff(&self, path: &str, rev: Option<&str>) -> CommandSpec {
        let mut args = vec!["diff".to_string(), "--git".to_string()];
        if let Some(rev) = rev {
            args.push("-c".to_string());
            args.push(rev.to_string());
        }
        args.push("--".to_string());
        args.push(format!("path:{}", path));
        self.hg(args)
    }

    pub fn shelve_patch(&self, name: &str) -> CommandSpec {
        self.with_extension("shelve", &["shelve", "--patch", "--", name])
    }

    pub fn update(&self, rev: &str) -> CommandSpec {
        self.hg(["update", "-r", rev])
    }

    pub fn strip(&self, rev: &str) -> CommandSpec {
        self.with_extension("strip", &["strip", "-r", rev])
    }

    pub fn revert_all(&self, rev: Option<&str>) -> CommandSpec {
        let mut args = vec!["revert", "--all", "--no-backup"];
        if let Some(rev) = rev {
            args.extend(["-r", rev]);
        }
        self.hg(args)
    }

    pub fn revert_paths(&self, paths: &[&str], rev: Option<&str>) -> CommandSpec {
        let mut args = vec!["revert".to_string(), "--no-backup".to_string()];
        if let Some(rev) = rev {
            args.push("-r".to_string());
            args.push(rev.to_string());
        }
        args.push("--".to_string());
        args.extend(paths.iter().map(|p| format!("path:{}", p)));
        self.hg(args)
    }

    pub fn shelve_create(&self, name: Option<&str>, paths: &[&str]) -> CommandSpec {
        let mut args = vec!["shelve"];
        if let Some(name) = name {
            args.extend(["--name", name]);
        }
        if !paths.is_empty() {
            args.push("--");
            args.extend(paths.iter().copied());
        }
        self.with_extension("shelve", &args)
    }

    pub fn shelve_delete(&self, name: &str) -> CommandSpec {
        self.with_extension("shelve", &["shelve", "--delete", "--", name])
    }

    pub fn unshelve(&self, name: &str) -> CommandSpec {
        self.with_extension("shelve", &["unshelve", "--", name])
    }

    pub fn commit(&self, message: &str) -> CommandSpec {
        self.hg(["commit", "-m", message])
    }

    pub fn amend(&self, message: &str) -> CommandSpec {
        self.hg(["commit", "--amend", "-m", message])
    }

    /// Copies `rev` on top of the working copy's parent.
    pub fn duplicate(&self, rev: &str) -> CommandSpec {
        self.hg(["graft", "-r", rev])
    }

    pub fn uncommit(&self) -> CommandSpec {
        self.with_extension("uncommit", &["uncommit"])
    }

    pub fn phase_get(&self, rev: &str) -> CommandSpec {
        self.hg(["phase", "-r", rev])
    }

    pub fn phase_set(&self, rev: &str, phase: Phase) -> CommandSpec {
        let flag = format!("--{}", phase.as_str());
        self.hg(["phase", flag.as_str(), "--force", "-r", rev])
    }

    /// Reverse-applies a staged patch relative to the repository root.
    pub fn patch_reverse(&self, patch_file: &Path) -> CommandSpec {
        CommandSpec::new(
            &self.patch,
            [
                "-R".to_string(),
                "-p1".to_string(),
                "-i".to_string(),
                patch_file.display().to_string(),
            ],
        )
    }
}
