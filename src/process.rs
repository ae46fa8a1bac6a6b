use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::vcs::CommandSpec;

/// Runs one command to completion and hands back everything it printed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, cwd: &Path) -> Result<String>;
}

/// Spawns real child processes.
///
/// The exit status is not inspected: stdout followed by stderr is returned
/// for every process that could be started.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, cwd: &Path) -> Result<String> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        tracing::debug!(command = %spec, cwd = %cwd.display(), "spawning");
        let child = cmd.spawn().map_err(|source| Error::Launch {
            program: spec.program.clone(),
            source,
        })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|err| Error::io(format!("wait for `{}`", spec.program), err))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        tracing::debug!(
            command = %spec,
            status = ?output.status.code(),
            bytes = text.len(),
            "process exited"
        );
        Ok(text)
    }
}
