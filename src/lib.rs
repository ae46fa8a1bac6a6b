pub mod actions;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod nav;
pub mod orchestrator;
pub mod parse;
pub mod patch;
pub mod process;
pub mod repo;
pub mod tree;
pub mod tui;
pub mod vcs;

mod tui_shell;

pub use error::{Error, Result};
