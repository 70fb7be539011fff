//! Manifest types.
//!
//! # Example
//!
//! ```json
//! {
//!   "modules": [
//!     {
//!       "name": "core",
//!       "version": "2",
//!       "source_dir": "/src/motor",
//!       "files": {
//!         "main.c": {
//!           "source": "/src/motor/main.c",
//!           "compiler_flags": ["-std=c11", "-DMAIN"],
//!           "include_dirs": ["include"],
//!           "required_actions": 0
//!         }
//!       },
//!       "prebuild_steps": [{ "outputs": ["gen/version.h"], "dependencies": [] }]
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::module::{CompileFile, Module, ModuleVersion};

/// Every registered module, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
  pub modules: Vec<ModuleManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
  pub name: String,
  pub version: ModuleVersion,
  pub source_dir: PathBuf,
  pub files: BTreeMap<String, FileManifest>,
  pub prebuild_steps: Vec<StepManifest>,
}

/// One source file with module-wide values already merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileManifest {
  pub source: PathBuf,
  pub compiler_flags: Vec<String>,
  pub include_dirs: Vec<PathBuf>,
  /// Number of actions that must complete before this file compiles.
  pub required_actions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepManifest {
  pub outputs: Vec<String>,
  pub dependencies: Vec<String>,
}

impl BuildManifest {
  pub fn from_modules<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Self {
    Self {
      modules: modules.into_iter().map(ModuleManifest::from_module).collect(),
    }
  }

  pub fn module(&self, name: &str) -> Option<&ModuleManifest> {
    self.modules.iter().find(|m| m.name == name)
  }
}

impl ModuleManifest {
  pub fn from_module(module: &Module) -> Self {
    let files = module
      .files()
      .iter()
      .map(|(name, file)| (name.clone(), FileManifest::merged(module, file)))
      .collect();

    let prebuild_steps = module
      .prebuild_steps()
      .iter()
      .map(|step| StepManifest {
        outputs: step.outputs.clone(),
        dependencies: step.dependencies.clone(),
      })
      .collect();

    Self {
      name: module.name().to_string(),
      version: module.version().clone(),
      source_dir: module.source_dir().to_path_buf(),
      files,
      prebuild_steps,
    }
  }
}

impl FileManifest {
  fn merged(module: &Module, file: &CompileFile) -> Self {
    Self {
      source: file.source().to_path_buf(),
      compiler_flags: module
        .compiler_flags()
        .iter()
        .chain(file.compiler_flags())
        .cloned()
        .collect(),
      include_dirs: module
        .include_dirs()
        .iter()
        .chain(file.include_dirs())
        .cloned()
        .collect(),
      required_actions: file.required_actions().len(),
    }
  }
}
