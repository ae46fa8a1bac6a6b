use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "hgtree.json";
pub const DEFAULT_REVSET: &str = "sort(all(), topo)";
pub const DEFAULT_LIMIT: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mercurial executable.
    pub hg: String,
    /// `patch` executable used for hunk reverts.
    pub patch: String,
    pub revset: String,
    pub limit: usize,
    /// Defaults to `.hg/hgtree.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hg: "hg".to_string(),
            patch: "patch".to_string(),
            revset: DEFAULT_REVSET.to_string(),
            limit: DEFAULT_LIMIT,
            log_file: None,
        }
    }
}

impl Config {
    pub fn path(repo_root: &Path) -> PathBuf {
        repo_root.join(".hg").join(CONFIG_FILE)
    }

    /// Reads `.hg/hgtree.json`; a missing file yields the defaults.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::path(repo_root);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(Error::io(format!("read {}", path.display()), err)),
        };
        let cfg: Config = serde_json::from_slice(&bytes).map_err(|err| Error::Config {
            path: path.clone(),
            message: err.to_string(),
        })?;
        if cfg.limit == 0 {
            return Err(Error::Config {
                path,
                message: "limit must be positive".to_string(),
            });
        }
        Ok(cfg)
    }

    pub fn log_path(&self, repo_root: &Path) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| repo_root.join(".hg").join("hgtree.log"))
    }
}
