//! Hunk-level revert through the external `patch` tool.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::model::{FileEntry, Hunk};
use crate::orchestrator::Orchestrator;
use crate::process::CommandRunner;
use crate::vcs::Vcs;

/// File preamble, then the hunk, then one blank line.
pub fn hunk_patch_text(header: &[String], hunk: &Hunk) -> String {
    let mut text = String::new();
    for line in header.iter().chain(&hunk.lines) {
        text.push_str(line);
        text.push('\n');
    }
    text.push('\n');
    text
}

/// A patch written to a temporary file; the file is removed on drop.
pub struct StagedPatch {
    file: NamedTempFile,
}

impl StagedPatch {
    pub fn write(text: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("hgtree-")
            .suffix(".patch")
            .tempfile()
            .map_err(|err| Error::io("create patch file", err))?;
        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|err| Error::io(format!("write {}", file.path().display()), err))?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Reverse-applies one hunk of `file` in the working copy and returns what
/// the tool printed.
pub async fn revert_hunk<R: CommandRunner>(
    orch: &Orchestrator<R>,
    vcs: &Vcs,
    file: &FileEntry,
    hunk: &Hunk,
) -> Result<String> {
    if file.header.is_empty() {
        return Err(Error::Unsupported(format!(
            "no diff header known for {}",
            file.path
        )));
    }
    let staged = StagedPatch::write(&hunk_patch_text(&file.header, hunk))?;
    tracing::info!(path = %file.path, patch = %staged.path().display(), "reverting hunk");
    orch.run_one("revert hunk", &vcs.patch_reverse(staged.path()))
        .await
}
