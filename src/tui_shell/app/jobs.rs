use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::actions::{self, Plan};
use crate::orchestrator::{Orchestrator, Progress};
use crate::tree::{FetchPlan, RefreshPlan};
use crate::vcs::Vcs;

/// Results of background work, applied by the UI thread between key events.
pub(super) enum JobMsg {
    Started(String),
    Finished(String),
    Refreshed {
        plan: RefreshPlan,
        result: crate::Result<Vec<String>>,
    },
    Expanded {
        plan: FetchPlan,
        result: crate::Result<Vec<String>>,
    },
    Mutated {
        label: String,
        refresh: bool,
        result: crate::Result<String>,
    },
}

struct ChannelProgress(Sender<JobMsg>);

impl Progress for ChannelProgress {
    fn started(&self, label: &str) {
        let _ = self.0.send(JobMsg::Started(label.to_string()));
    }

    fn finished(&self, label: &str) {
        let _ = self.0.send(JobMsg::Finished(label.to_string()));
    }
}

pub(super) struct Jobs {
    rt: Runtime,
    orch: Arc<Orchestrator>,
    vcs: Vcs,
    tx: Sender<JobMsg>,
    rx: Receiver<JobMsg>,
}

impl Jobs {
    pub(super) fn new(root: PathBuf, vcs: Vcs) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("start async runtime")?;
        let (tx, rx) = mpsc::channel();
        let orch = Orchestrator::processes(root).with_progress(Arc::new(ChannelProgress(tx.clone())));
        Ok(Self {
            rt,
            orch: Arc::new(orch),
            vcs,
            tx,
            rx,
        })
    }

    pub(super) fn refresh(&self, plan: RefreshPlan) {
        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        let specs = self.vcs.refresh_specs();
        self.rt.spawn(async move {
            let result = orch.run_all("refresh", &specs).await;
            let _ = tx.send(JobMsg::Refreshed { plan, result });
        });
    }

    pub(super) fn expand(&self, plan: FetchPlan) {
        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        let label = plan.fetch.label();
        let specs = plan.fetch.specs(&self.vcs);
        self.rt.spawn(async move {
            let result = orch.run_all(&label, &specs).await;
            let _ = tx.send(JobMsg::Expanded { plan, result });
        });
    }

    pub(super) fn mutate(&self, label: String, plan: Plan) {
        let orch = Arc::clone(&self.orch);
        let tx = self.tx.clone();
        let vcs = self.vcs.clone();
        self.rt.spawn(async move {
            let result = actions::execute(&orch, &vcs, &plan).await;
            let refresh = plan.refreshes();
            let _ = tx.send(JobMsg::Mutated {
                label,
                refresh,
                result,
            });
        });
    }

    pub(super) fn try_recv(&self) -> Option<JobMsg> {
        self.rx.try_recv().ok()
    }
}
