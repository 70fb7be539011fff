//! Repository scanning.
//!
//! A repository directory holds a `ctor.cfg` descriptor and a `modules/`
//! directory of `*.ctor` module definitions:
//!
//! ```text
//! motor/
//! ├── ctor.cfg          -- repository = "motor"; source_dir = "src"
//! └── modules/
//!     ├── audio.ctor
//!     └── graphics.ctor
//! ```
//!
//! Scanning loads every definition but registers nothing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::consts::{DEFINITION_EXT, DESCRIPTOR_FILE, MODULES_DIR};
use crate::eval::LoadError;
use crate::lua::DefinitionLoader;
use crate::lua::loaders::resolve_against;
use crate::module::Module;

/// A repository's descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
  /// Display name.
  pub repository: String,
  /// Base directory for every module found in the repository.
  pub source_dir: PathBuf,
}

/// Read and validate the descriptor of the repository at `dir`.
pub fn read_descriptor(loader: &DefinitionLoader, dir: &Path) -> Result<RepositoryDescriptor, LoadError> {
  let path = dir.join(DESCRIPTOR_FILE);
  let fields = loader.read_descriptor(&path)?;

  let missing = |field: &str| LoadError::RepositoryDescriptor {
    path: path.clone(),
    reason: format!("missing required field '{}'", field),
  };

  let repository = fields.repository.ok_or_else(|| missing("repository"))?;
  let source_dir = fields.source_dir.ok_or_else(|| missing("source_dir"))?;
  let source_dir = resolve_against(dir, &source_dir);
  let source_dir = match dunce::canonicalize(&source_dir) {
    Ok(canonical) => canonical,
    Err(e) => {
      warn!(
        repository = %repository,
        source_dir = %source_dir.display(),
        error = %e,
        "source directory cannot be resolved, using it as written"
      );
      source_dir
    }
  };

  Ok(RepositoryDescriptor { repository, source_dir })
}

/// List the module definitions of the repository at `dir`, sorted by file name.
///
/// A repository without a `modules/` directory has no definitions.
pub fn discover_definitions(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
  let modules_dir = dir.join(MODULES_DIR);
  if !modules_dir.is_dir() {
    debug!(dir = %modules_dir.display(), "no modules directory");
    return Ok(Vec::new());
  }

  let io_error = |source| LoadError::Io {
    path: modules_dir.clone(),
    source,
  };

  let mut definitions = Vec::new();
  for entry in fs::read_dir(&modules_dir).map_err(io_error)? {
    let path = entry.map_err(io_error)?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == DEFINITION_EXT) {
      definitions.push(path);
    }
  }
  definitions.sort();
  Ok(definitions)
}

/// Load every module defined in the repository at `dir`.
pub fn scan_repository(loader: &DefinitionLoader, dir: &Path) -> Result<Vec<Module>, LoadError> {
  let descriptor = read_descriptor(loader, dir)?;
  info!(
    repository = %descriptor.repository,
    source_dir = %descriptor.source_dir.display(),
    "scanning repository"
  );

  discover_definitions(dir)?
    .iter()
    .map(|path| loader.load_file(path, &descriptor.source_dir))
    .collect()
}
