use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

mod cli_exec;
mod cli_runtime;

#[derive(Subcommand)]
enum Commands {
    /// Print the revision tree as indented text
    Dump {
        /// Expand every changeset, shelve and file before printing
        #[arg(long)]
        expand_all: bool,
    },

    /// Print the repository root
    Root,

    /// Print the effective configuration as JSON
    Config,
}

/// Options shared by the TUI and every subcommand.
#[derive(clap::Args, Clone, Debug, Default)]
struct GlobalOpts {
    /// Repository path (defaults to the current directory)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,
    /// Revset selecting the changesets to show
    #[arg(long, global = true)]
    revset: Option<String>,
    /// Maximum number of changesets to fetch
    #[arg(long, global = true)]
    limit: Option<usize>,
    /// Mercurial executable
    #[arg(long, global = true)]
    hg: Option<String>,
    /// Log file (defaults to .hg/hgtree.log)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    cli_runtime::run()
}
