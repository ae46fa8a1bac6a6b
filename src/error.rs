use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the revision tree engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no Mercurial repository found at or above {}", path.display())]
    RepositoryNotFound { path: PathBuf },

    #[error("no parent node")]
    NoParent,

    #[error("no child node")]
    NoChild,

    #[error("no sibling node")]
    NoSibling,

    #[error("nothing selected")]
    NothingSelected,

    #[error("{0}")]
    Unsupported(String),

    #[error("expected {expected} command outputs, got {got}")]
    MissingOutput { expected: usize, got: usize },

    #[error("invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Navigation dead ends are reported to the user and leave the cursor alone.
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::NoParent | Self::NoChild | Self::NoSibling)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
