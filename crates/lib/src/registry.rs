//! The module registry.
//!
//! Maps each module name to the highest-version [`Module`] seen across every
//! scanned repository. Registering a module whose version does not beat the
//! current entry discards it, so the winner depends only on the versions
//! present; equal versions keep whichever module was registered first.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::{ActionHandle, PrebuildStep};
use crate::manifest::BuildManifest;
use crate::module::{Module, ModuleVersion};

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  #[error("module '{name}' was not found in any scanned repository")]
  ModuleNotFound { name: String },
}

/// What [`Registry::register`] did with a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
  /// No module with that name existed.
  Inserted,
  /// The incoming module beat the existing entry.
  Replaced { previous: ModuleVersion },
  /// The existing entry's version was greater or equal; the incoming module was dropped.
  Discarded { existing: ModuleVersion },
}

#[derive(Debug)]
struct Entry {
  seq: u64,
  module: Module,
}

/// Name to winning-module mapping.
#[derive(Debug, Default)]
pub struct Registry {
  entries: BTreeMap<String, Entry>,
  next_seq: u64,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a module, keeping the highest version per name.
  pub fn register(&mut self, module: Module) -> Registration {
    let seq = self.next_seq;
    self.next_seq += 1;

    match self.entries.get_mut(module.name()) {
      None => {
        info!(module = module.name(), version = %module.version(), "registered module");
        self.entries.insert(module.name().to_string(), Entry { seq, module });
        Registration::Inserted
      }
      Some(entry) if entry.module.version() < module.version() => {
        let previous = entry.module.version().clone();
        info!(
          module = module.name(),
          version = %module.version(),
          previous = %previous,
          "newer module version replaces registered one"
        );
        *entry = Entry { seq, module };
        Registration::Replaced { previous }
      }
      Some(entry) => {
        let existing = entry.module.version().clone();
        warn!(
          module = module.name(),
          version = %module.version(),
          existing = %existing,
          "discarding module: registered version is not older"
        );
        Registration::Discarded { existing }
      }
    }
  }

  pub fn lookup(&self, name: &str) -> Result<&Module, RegistryError> {
    self.get(name).ok_or_else(|| RegistryError::ModuleNotFound { name: name.to_string() })
  }

  pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Module, RegistryError> {
    self
      .entries
      .get_mut(name)
      .map(|entry| &mut entry.module)
      .ok_or_else(|| RegistryError::ModuleNotFound { name: name.to_string() })
  }

  pub fn get(&self, name: &str) -> Option<&Module> {
    self.entries.get(name).map(|entry| &entry.module)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Registered modules in the order their winning versions were registered.
  pub fn modules(&self) -> Vec<&Module> {
    let mut entries: Vec<&Entry> = self.entries.values().collect();
    entries.sort_by_key(|entry| entry.seq);
    entries.into_iter().map(|entry| &entry.module).collect()
  }

  /// Every pre-build step, with its module's name, in registration order.
  pub fn prebuild_steps(&self) -> Vec<(&str, &PrebuildStep)> {
    let steps: Vec<(&str, &PrebuildStep)> = self
      .modules()
      .into_iter()
      .flat_map(|module| module.prebuild_steps().iter().map(move |step| (module.name(), step)))
      .collect();
    debug!(count = steps.len(), "collected pre-build steps");
    steps
  }

  /// Every per-file required action as `(module, file, action)`.
  ///
  /// Modules come in registration order, files by name, and each file's
  /// actions in the order they were added.
  pub fn required_actions(&self) -> Vec<(&str, &str, &ActionHandle)> {
    self
      .modules()
      .into_iter()
      .flat_map(|module| {
        module.files().iter().flat_map(move |(file, compile_file)| {
          compile_file
            .required_actions()
            .iter()
            .map(move |action| (module.name(), file.as_str(), action))
        })
      })
      .collect()
  }

  /// Snapshot of every registered module for the compile driver.
  pub fn manifest(&self) -> BuildManifest {
    BuildManifest::from_modules(self.modules())
  }
}
