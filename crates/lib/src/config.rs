//! Build configuration.
//!
//! A build configuration names the repositories to scan and the modules to
//! configure, with per-module options:
//!
//! ```json
//! {
//!   "module_dirs": ["deps/motor", "."],
//!   "modules": {
//!     "core": { "debug": true },
//!     "audio": {}
//!   }
//! }
//! ```
//!
//! `modules` keeps its declaration order; configure hooks run in that order.
//! Extra repository directories can be appended through `CTOR_MODULE_PATH`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::MODULE_PATH_ENV;
use crate::lua::loaders::resolve_against;

/// Ordered mapping from module name to that module's options.
pub type ModuleOptions = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("cannot read build configuration {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid build configuration {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Repository directories, scanned in order.
  #[serde(default)]
  pub module_dirs: Vec<PathBuf>,
  /// Active modules and their options.
  #[serde(default)]
  pub modules: ModuleOptions,
}

impl BuildConfig {
  /// Read a JSON build configuration.
  ///
  /// Relative `module_dirs` resolve against the configuration file's directory.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config: BuildConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let base = path.parent().unwrap_or(Path::new("."));
    config.module_dirs = config
      .module_dirs
      .iter()
      .map(|dir| resolve_against(base, &dir.to_string_lossy()))
      .collect();

    debug!(
      path = %path.display(),
      repositories = config.module_dirs.len(),
      modules = config.modules.len(),
      "loaded build configuration"
    );
    Ok(config)
  }

  /// Configured repository directories followed by any from `CTOR_MODULE_PATH`.
  pub fn repository_dirs(&self) -> Vec<PathBuf> {
    let mut dirs = self.module_dirs.clone();
    if let Some(extra) = std::env::var_os(MODULE_PATH_ENV) {
      dirs.extend(std::env::split_paths(&extra).filter(|p| !p.as_os_str().is_empty()));
    }
    dirs
  }
}
