//! Build orchestration.
//!
//! A build runs three phases, always forward:
//!
//! 1. **Loading** - scan every repository and register every module
//! 2. **Configuring** - call `configure(options)` for each module selected by
//!    the build configuration, in configuration order
//! 3. **PreBuilding** - run every registered pre-build step in registration order,
//!    then every per-file required action
//!
//! The first error ends the build. Nothing is retried and no later phase runs.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::{error, info, info_span};

use crate::action::StepError;
use crate::config::{BuildConfig, ConfigError, ModuleOptions};
use crate::eval::{LoadError, load_modules};
use crate::manifest::BuildManifest;
use crate::registry::{Registry, RegistryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
  Loading,
  Configuring,
  PreBuilding,
}

impl fmt::Display for BuildPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BuildPhase::Loading => "loading",
      BuildPhase::Configuring => "configuring",
      BuildPhase::PreBuilding => "pre-building",
    };
    f.write_str(name)
  }
}

/// Errors that end a build.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Load(#[from] LoadError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  /// A module's configure hook failed.
  #[error("configure of module '{module}' failed: {source}")]
  Configure {
    module: String,
    #[source]
    source: StepError,
  },

  /// A pre-build step failed; later steps did not run.
  #[error("pre-build step {index} of module '{module}' failed: {source}")]
  PreBuildStep {
    module: String,
    index: usize,
    #[source]
    source: StepError,
  },

  /// An action required by one source file failed; later actions did not run.
  #[error("required action {index} of file '{file}' in module '{module}' failed: {source}")]
  RequiredAction {
    module: String,
    file: String,
    index: usize,
    #[source]
    source: StepError,
  },
}

impl BuildError {
  /// The phase the build was in when it failed.
  pub fn phase(&self) -> BuildPhase {
    match self {
      BuildError::Config(_) | BuildError::Load(_) => BuildPhase::Loading,
      BuildError::Registry(_) | BuildError::Configure { .. } => BuildPhase::Configuring,
      BuildError::PreBuildStep { .. } | BuildError::RequiredAction { .. } => BuildPhase::PreBuilding,
    }
  }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
  /// Modules whose configure hooks ran, in order.
  pub configured: Vec<String>,
  /// Number of pre-build steps executed.
  pub steps_run: usize,
  /// Number of per-file required actions executed.
  pub actions_run: usize,
  /// Registry snapshot after configuration, for the compile driver.
  pub manifest: BuildManifest,
}

/// Run a full build: load, configure, then run pre-build steps.
pub fn build(config: &BuildConfig) -> Result<BuildReport, BuildError> {
  let mut registry = {
    let _span = info_span!("phase", phase = %BuildPhase::Loading).entered();
    load_modules(&config.repository_dirs())?
  };
  run(&mut registry, &config.modules)
}

/// Read a JSON build configuration from `path` and build it.
pub fn build_from_file(path: &Path) -> Result<BuildReport, BuildError> {
  let config = BuildConfig::from_file(path)?;
  build(&config)
}

/// Run the Configuring and PreBuilding phases against an already loaded registry.
pub fn run(registry: &mut Registry, modules: &ModuleOptions) -> Result<BuildReport, BuildError> {
  let configured = {
    let _span = info_span!("phase", phase = %BuildPhase::Configuring).entered();
    configure_modules(registry, modules)?
  };
  info!(modules = configured.len(), "configuration done");

  let manifest = registry.manifest();

  let (steps_run, actions_run) = {
    let _span = info_span!("phase", phase = %BuildPhase::PreBuilding).entered();
    (run_prebuild_steps(registry)?, run_required_actions(registry)?)
  };

  Ok(BuildReport {
    configured,
    steps_run,
    actions_run,
    manifest,
  })
}

/// Call each selected module's configure hook, in `modules` order.
pub fn configure_modules(registry: &mut Registry, modules: &ModuleOptions) -> Result<Vec<String>, BuildError> {
  let mut configured = Vec::with_capacity(modules.len());

  for (name, options) in modules {
    let module = registry.lookup_mut(name)?;
    info!(module = %name, version = %module.version(), "configuring module");

    if let Some(hook) = module.configure_hook().cloned() {
      hook.configure(module, options).map_err(|source| {
        error!(module = %name, error = %source, "configure failed");
        BuildError::Configure {
          module: name.clone(),
          source,
        }
      })?;
    }
    configured.push(name.clone());
  }

  Ok(configured)
}

/// Run every registered pre-build step in registration order.
///
/// Stops at the first failing step.
pub fn run_prebuild_steps(registry: &Registry) -> Result<usize, BuildError> {
  let steps = registry.prebuild_steps();
  info!(count = steps.len(), "executing pre-build steps");

  let mut index_in_module = 0;
  let mut current_module = "";
  for (module, step) in &steps {
    if *module != current_module {
      current_module = *module;
      index_in_module = 0;
    }

    step.action.run().map_err(|source| {
      error!(module = %module, step = index_in_module, error = %source, "pre-build step failed");
      BuildError::PreBuildStep {
        module: module.to_string(),
        index: index_in_module,
        source,
      }
    })?;
    index_in_module += 1;
  }

  Ok(steps.len())
}

/// Run every source file's required actions, after all pre-build steps.
///
/// Stops at the first failing action.
pub fn run_required_actions(registry: &Registry) -> Result<usize, BuildError> {
  let actions = registry.required_actions();
  info!(count = actions.len(), "executing required file actions");

  let mut index_in_file = 0;
  let mut current = ("", "");
  for (module, file, action) in &actions {
    if (*module, *file) != current {
      current = (*module, *file);
      index_in_file = 0;
    }

    action.run().map_err(|source| {
      error!(module = %module, file = %file, action = index_in_file, error = %source, "required action failed");
      BuildError::RequiredAction {
        module: module.to_string(),
        file: file.to_string(),
        index: index_in_file,
        source,
      }
    })?;
    index_in_file += 1;
  }

  Ok(actions.len())
}
