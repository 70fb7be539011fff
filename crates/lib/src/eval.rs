//! Module loading across repositories.
//!
//! [`load_modules`] composes the repository scanner, the definition loader and
//! the registry: every repository is scanned in order, every module found is
//! registered, and the first failure stops the pass.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::lua::DefinitionLoader;
use crate::module::ModuleError;
use crate::registry::Registry;
use crate::repository::scan_repository;

/// Errors that can occur while loading modules.
#[derive(Debug, Error)]
pub enum LoadError {
  /// The definition ran but its result is malformed or incomplete.
  #[error("invalid module definition {}: {reason}", path.display())]
  InvalidModuleDefinition { path: PathBuf, reason: String },

  /// A builder function rejected a declaration.
  #[error("module definition {}: {source}", path.display())]
  Declaration {
    path: PathBuf,
    #[source]
    source: ModuleError,
  },

  /// The definition failed to compile or raised an error.
  #[error("module definition {} failed: {source}", path.display())]
  Script {
    path: PathBuf,
    #[source]
    source: LuaError,
  },

  /// The repository descriptor is missing, unreadable or incomplete.
  #[error("invalid repository descriptor {}: {reason}", path.display())]
  RepositoryDescriptor { path: PathBuf, reason: String },

  #[error("cannot read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),
}

/// Scan `repository_dirs` in order and register every module found.
///
/// # Example
/// ```ignore
/// use std::path::PathBuf;
/// use ctor_lib::eval::load_modules;
///
/// let registry = load_modules(&[PathBuf::from("deps/motor"), PathBuf::from(".")])?;
/// println!("modules: {}", registry.len());
/// ```
pub fn load_modules<P: AsRef<Path>>(repository_dirs: &[P]) -> Result<Registry, LoadError> {
  let loader = DefinitionLoader::new()?;
  load_modules_with(&loader, repository_dirs)
}

/// Like [`load_modules`], reusing an existing loader.
pub fn load_modules_with<P: AsRef<Path>>(loader: &DefinitionLoader, repository_dirs: &[P]) -> Result<Registry, LoadError> {
  let mut registry = Registry::new();

  for dir in repository_dirs {
    let dir = dir.as_ref();
    for module in scan_repository(loader, dir)? {
      registry.register(module);
    }
  }

  info!(
    repositories = repository_dirs.len(),
    modules = registry.len(),
    "module loading complete"
  );
  Ok(registry)
}
