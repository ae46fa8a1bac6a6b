use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hgtree::config::Config;

use crate::{Commands, GlobalOpts};

#[derive(Parser)]
#[command(name = "hgtree")]
#[command(about = "Terminal revision tree for Mercurial repositories", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Repository root and the configuration with command-line overrides applied.
pub(crate) struct Session {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

pub(crate) fn open_session(opts: &GlobalOpts) -> Result<Session> {
    let start = match &opts.repo {
        Some(p) => p.clone(),
        None => std::env::current_dir().context("get current dir")?,
    };
    let root = hgtree::repo::discover(&start)?;
    let mut config = Config::load(&root)?;
    if let Some(revset) = &opts.revset {
        config.revset = revset.clone();
    }
    if let Some(limit) = opts.limit {
        anyhow::ensure!(limit > 0, "--limit must be positive");
        config.limit = limit;
    }
    if let Some(hg) = &opts.hg {
        config.hg = hg.clone();
    }
    if let Some(log_file) = &opts.log_file {
        config.log_file = Some(log_file.clone());
    }
    Ok(Session { root, config })
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let session = open_session(&cli.opts)?;

    match cli.command {
        None => {
            let log_path = session.config.log_path(&session.root);
            hgtree::logging::init_file(&log_path)
                .with_context(|| format!("initialize logging at {}", log_path.display()))?;
            hgtree::tui::run_with_options(hgtree::tui::TuiRunOptions {
                repo_root: session.root,
                config: session.config,
            })?;
        }
        Some(command) => {
            hgtree::logging::init_stderr();
            crate::cli_exec::handle_command(&session, command)?
        }
    }

    Ok(())
}
