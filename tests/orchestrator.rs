use std::sync::{Arc, Mutex};

use anyhow::Result;

use hgtree::Error;
use hgtree::orchestrator::{Orchestrator, Progress};
use hgtree::vcs::CommandSpec;

#[derive(Default)]
struct Labels(Mutex<Vec<String>>);

impl Progress for Labels {
    fn started(&self, label: &str) {
        self.0.lock().unwrap().push(format!("+{}", label));
    }
    fn finished(&self, label: &str) {
        self.0.lock().unwrap().push(format!("-{}", label));
    }
}

#[tokio::test]
async fn echo_outputs_come_back_in_spec_order() -> Result<()> {
    let orch = Orchestrator::processes(".");
    let specs = [
        CommandSpec::new("sh", ["-c", "sleep 0.2; echo a"]),
        CommandSpec::new("echo", ["b"]),
    ];
    assert_eq!(orch.run_all("echo", &specs).await?, ["a\n", "b\n"]);
    Ok(())
}

#[tokio::test]
async fn error_text_is_plain_output() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let orch = Orchestrator::processes(tmp.path());
    let spec = CommandSpec::new("sh", ["-c", "echo 'abort: no repository found' >&2; exit 255"]);
    let out = orch.run_one("status", &spec).await?;
    assert_eq!(out, "abort: no repository found\n");
    assert!(hgtree::parse::parse_status_files(&out, None).is_empty());
    Ok(())
}

#[tokio::test]
async fn one_missing_program_fails_the_round() -> Result<()> {
    let labels = Arc::new(Labels::default());
    let orch = Orchestrator::processes(".").with_progress(labels.clone());
    let specs = [
        CommandSpec::new("echo", ["fine"]),
        CommandSpec::new("hgtree-no-such-program", Vec::<String>::new()),
    ];
    let err = orch.run_all("round", &specs).await.unwrap_err();
    assert!(matches!(err, Error::Launch { ref program, .. } if program == "hgtree-no-such-program"));
    assert_eq!(*labels.0.lock().unwrap(), ["+round", "-round"]);
    Ok(())
}
