use anyhow::{Context, Result};

use hgtree::orchestrator::Orchestrator;
use hgtree::tree::TreeEngine;
use hgtree::vcs::Vcs;

use crate::Commands;
use crate::cli_runtime::Session;

pub(crate) fn handle_command(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Dump { expand_all } => {
            for line in dump(session, expand_all)? {
                println!("{}", line);
            }
        }
        Commands::Root => {
            println!("{}", session.root.display());
        }
        Commands::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&session.config).context("serialize config json")?
            );
        }
    }
    Ok(())
}

fn dump(session: &Session, expand_all: bool) -> Result<Vec<String>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let vcs = Vcs::new(&session.config);
    let orch = Orchestrator::processes(&session.root);

    rt.block_on(async {
        let mut tree = TreeEngine::new();
        tree.refresh(&orch, &vcs).await.context("refresh")?;
        if expand_all {
            tree.expand_all(&orch, &vcs).await.context("expand")?;
        }
        Ok::<_, anyhow::Error>(tree.outline())
    })
}
