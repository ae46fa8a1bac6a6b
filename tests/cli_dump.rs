#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Stand-in `hg` answering the queries of a two-changeset repository.
const FAKE_HG: &str = r#"#!/bin/sh
case "$*" in
  *"log -r parents()"*) echo c2 ;;
  log*) printf 'changeset: c3\nsummary: third\nparent: c2\nchangeset: c2\nsummary: second\nparent: 000000000000\n' ;;
  "status --change .") echo "A b.txt" ;;
  "status --change c3") echo "M x.txt" ;;
  status) echo "M a.txt" ;;
  *"shelve --list"*) echo "wip (1h ago) changes to: third" ;;
  *"shelve --patch"*) printf 'diff --git a/s.txt b/s.txt\n--- a/s.txt\n+++ b/s.txt\n@@ -1 +1 @@\n-1\n+2\n' ;;
  diff*) printf 'diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -3 +3 @@\n-x\n+y\n' ;;
esac
"#;

fn fake_repo(dir: &Path) -> Result<String> {
    fs::create_dir_all(dir.join(".hg")).context("create .hg")?;
    let hg = dir.join("fake-hg");
    fs::write(&hg, FAKE_HG).context("write fake hg")?;
    fs::set_permissions(&hg, fs::Permissions::from_mode(0o755)).context("chmod fake hg")?;
    Ok(hg.display().to_string())
}

fn run_hgtree(dir: &Path, args: &[&str]) -> Result<(bool, String, String)> {
    let out = Command::new(env!("CARGO_BIN_EXE_hgtree"))
        .args(args)
        .current_dir(dir)
        .env_remove("HGTREE_LOG")
        .output()
        .with_context(|| format!("run hgtree {:?}", args))?;
    Ok((
        out.status.success(),
        String::from_utf8_lossy(&out.stdout).to_string(),
        String::from_utf8_lossy(&out.stderr).to_string(),
    ))
}

#[test]
fn dump_prints_the_initial_tree() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let hg = fake_repo(tmp.path())?;

    let (ok, stdout, stderr) = run_hgtree(tmp.path(), &["dump", "--hg", hg.as_str()])?;
    assert!(ok, "stderr: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "- Pending changes",
            "  + M a.txt",
            "-- history --",
            "+ o c3 third",
            "- @ c2 second",
            "  + A b.txt",
            "-- shelves --",
            "+ wip (1h ago) changes to: third",
        ]
    );
    Ok(())
}

#[test]
fn dump_expand_all_reaches_hunks() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let hg = fake_repo(tmp.path())?;
    fs::create_dir_all(tmp.path().join("sub")).context("create sub")?;

    let (ok, stdout, stderr) =
        run_hgtree(&tmp.path().join("sub"), &["dump", "--expand-all", "--hg", hg.as_str()])?;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("- o c3 third\n  - M x.txt\n    @@ -3 +3 @@\n    -x\n    +y\n"), "{}", stdout);
    assert!(stdout.contains("- wip (1h ago) changes to: third\n  - M s.txt\n    @@ -1 +1 @@\n"), "{}", stdout);
    Ok(())
}

#[test]
fn root_is_found_from_a_subdirectory() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    fake_repo(tmp.path())?;
    fs::create_dir_all(tmp.path().join("a/b")).context("create a/b")?;

    let (ok, stdout, _) = run_hgtree(&tmp.path().join("a/b"), &["root"])?;
    assert!(ok);
    let root = fs::canonicalize(stdout.trim()).context("canonicalize output")?;
    assert_eq!(root, fs::canonicalize(tmp.path())?);
    Ok(())
}

#[test]
fn outside_a_repository_fails() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    let (ok, _, stderr) = run_hgtree(tmp.path(), &["root"])?;
    assert!(!ok);
    assert!(stderr.contains("no Mercurial repository found"), "{}", stderr);
    Ok(())
}

#[test]
fn config_file_and_flags_combine() -> Result<()> {
    let tmp = tempfile::tempdir().context("create tempdir")?;
    fake_repo(tmp.path())?;
    fs::write(tmp.path().join(".hg/hgtree.json"), r#"{"limit": 5, "revset": "draft()"}"#)
        .context("write config")?;

    let (ok, stdout, stderr) = run_hgtree(tmp.path(), &["config", "--limit", "7"])?;
    assert!(ok, "stderr: {}", stderr);
    let cfg: serde_json::Value = serde_json::from_str(&stdout).context("parse config json")?;
    assert_eq!(cfg["limit"], 7);
    assert_eq!(cfg["revset"], "draft()");
    assert_eq!(cfg["hg"], "hg");
    Ok(())
}
