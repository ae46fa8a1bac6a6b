use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::error::Result;
use crate::process::{CommandRunner, ProcessRunner};
use crate::vcs::CommandSpec;

/// Receives start/stop notices for in-flight command rounds.
pub trait Progress: Send + Sync {
    fn started(&self, label: &str);
    fn finished(&self, label: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn started(&self, _label: &str) {}
    fn finished(&self, _label: &str) {}
}

/// Dismisses the progress notice exactly once, however the round ends.
struct ProgressGuard<'a> {
    progress: &'a dyn Progress,
    label: &'a str,
}

impl<'a> ProgressGuard<'a> {
    fn start(progress: &'a dyn Progress, label: &'a str) -> Self {
        progress.started(label);
        Self { progress, label }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.progress.finished(self.label);
    }
}

/// Fans command rounds out to a runner and joins the results in order.
pub struct Orchestrator<R = ProcessRunner> {
    runner: R,
    cwd: PathBuf,
    progress: Arc<dyn Progress>,
}

impl Orchestrator<ProcessRunner> {
    pub fn processes(cwd: impl Into<PathBuf>) -> Self {
        Self::new(ProcessRunner, cwd)
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(runner: R, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cwd: cwd.into(),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Starts every spec at once and resolves with their outputs in `specs` order.
    pub async fn run_all(&self, label: &str, specs: &[CommandSpec]) -> Result<Vec<String>> {
        let _guard = ProgressGuard::start(self.progress.as_ref(), label);
        tracing::info!(label, count = specs.len(), "running command round");

        let results = join_all(specs.iter().map(|s| self.runner.run(s, &self.cwd))).await;
        results.into_iter().collect()
    }

    pub async fn run_one(&self, label: &str, spec: &CommandSpec) -> Result<String> {
        let mut out = self.run_all(label, std::slice::from_ref(spec)).await?;
        Ok(out.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Progress for Recorder {
        fn started(&self, label: &str) {
            self.0.lock().unwrap().push(format!("start {}", label));
        }
        fn finished(&self, label: &str) {
            self.0.lock().unwrap().push(format!("stop {}", label));
        }
    }

    #[tokio::test]
    async fn results_follow_spec_order_not_completion_order() {
        let orch = Orchestrator::processes(".");
        let specs = [
            CommandSpec::new("sh", ["-c", "sleep 0.3; echo a"]),
            CommandSpec::new("echo", ["b"]),
        ];
        let out = orch.run_all("test", &specs).await.unwrap();
        assert_eq!(out, ["a\n", "b\n"]);
    }

    #[tokio::test]
    async fn processes_start_concurrently() {
        let orch = Orchestrator::processes(".");
        let specs: Vec<_> = (0..4)
            .map(|_| CommandSpec::new("sh", ["-c", "sleep 0.4"]))
            .collect();
        let started = std::time::Instant::now();
        orch.run_all("sleepers", &specs).await.unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn progress_is_dismissed_once_even_for_empty_rounds() {
        let rec = Arc::new(Recorder::default());
        let orch = Orchestrator::processes(".").with_progress(rec.clone());
        let out = orch.run_all("empty", &[]).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(*rec.0.lock().unwrap(), ["start empty", "stop empty"]);
    }

    #[tokio::test]
    async fn launch_failure_still_dismisses_progress() {
        let rec = Arc::new(Recorder::default());
        let orch = Orchestrator::processes(".").with_progress(rec.clone());
        let spec = CommandSpec::new("hgtree-definitely-not-installed", Vec::<String>::new());
        assert!(orch.run_one("broken", &spec).await.is_err());
        assert_eq!(rec.0.lock().unwrap().len(), 2);
    }
}
