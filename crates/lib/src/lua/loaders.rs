//! Module-definition and repository-descriptor loading.
//!
//! A definition script runs in its own sandboxed environment (see
//! [`super::runtime`]) populated with the builder functions from
//! [`super::globals`], all bound to a fresh [`Module`]. Once the script has run,
//! its result namespace is read back: a returned table if the script returned
//! one, otherwise the environment its top-level assignments landed in. The
//! namespace must provide `name`, `version` and a `configure` function.
//!
//! The loader only produces modules; registering them is the
//! [`crate::registry::Registry`]'s job.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info};

use super::globals::{self, ModuleSlot};
use super::hooks::{LuaConfigure, module_error};
use super::runtime;
use crate::action::ConfigureHook;
use crate::eval::LoadError;
use crate::module::{Definition, Module, ModuleError, ModuleVersion};

/// Raw fields read from a repository descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorFields {
  pub repository: Option<String>,
  pub source_dir: Option<String>,
}

/// Executes module definitions and repository descriptors in one sandboxed
/// Lua state.
///
/// Modules produced by a loader keep Lua functions (configure hooks and
/// pre-build steps) that stay valid after the loader itself is dropped.
pub struct DefinitionLoader {
  lua: Lua,
}

impl DefinitionLoader {
  pub fn new() -> LuaResult<Self> {
    Ok(Self {
      lua: runtime::create_runtime()?,
    })
  }

  /// Load the module defined by the script at `path`.
  pub fn load_file(&self, path: &Path, source_dir: &Path) -> Result<Module, LoadError> {
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    self.load_source(path, &source, source_dir)
  }

  /// Load a module from definition source text; `origin` names it in errors.
  pub fn load_source(&self, origin: &Path, source: &str, source_dir: &Path) -> Result<Module, LoadError> {
    info!(path = %origin.display(), "reading module definition");

    let slot: ModuleSlot = Rc::new(RefCell::new(Some(Module::new(source_dir))));
    let env = runtime::create_environment(&self.lua)?;
    globals::register_builder(&self.lua, &env, slot.clone())?;

    let result = self
      .lua
      .load(source)
      .set_name(format!("@{}", origin.display()))
      .set_environment(env.clone())
      .eval::<LuaValue>()
      .map_err(|e| script_error(origin, e))?;

    // Seal the module before reading its namespace.
    let mut module = slot.borrow_mut().take().ok_or_else(|| LoadError::InvalidModuleDefinition {
      path: origin.to_path_buf(),
      reason: "module was taken while its definition ran".to_string(),
    })?;

    let namespace = match result {
      LuaValue::Table(t) => t,
      _ => env,
    };

    let invalid = |reason: String| LoadError::InvalidModuleDefinition {
      path: origin.to_path_buf(),
      reason,
    };

    let definition = read_namespace(&namespace).map_err(invalid)?;
    module.read_definition(definition).map_err(|e| invalid(e.to_string()))?;

    let configure = match namespace.get::<LuaValue>("configure")? {
      LuaValue::Function(f) => f,
      LuaValue::Nil => return Err(invalid("module definition is missing required function 'configure'".to_string())),
      other => {
        return Err(invalid(format!(
          "'configure' must be a function, got {}",
          other.type_name()
        )));
      }
    };

    module.set_configure(ConfigureHook::new(LuaConfigure::new(self.lua.clone(), configure, slot)));
    module.set_origin(origin);

    debug!(
      module = module.name(),
      version = %module.version(),
      files = module.files().len(),
      steps = module.prebuild_steps().len(),
      "module definition loaded"
    );
    Ok(module)
  }

  /// Evaluate a repository descriptor and return its raw fields.
  ///
  /// The descriptor is a Lua chunk run in an environment with no builder
  /// functions; `repository` and `source_dir` are read from its globals (or
  /// from a returned table).
  pub fn read_descriptor(&self, path: &Path) -> Result<DescriptorFields, LoadError> {
    let descriptor_error = |reason: String| LoadError::RepositoryDescriptor {
      path: path.to_path_buf(),
      reason,
    };

    let source = fs::read_to_string(path).map_err(|e| descriptor_error(format!("cannot read descriptor: {}", e)))?;
    let env = runtime::create_environment(&self.lua)?;
    let result = self
      .lua
      .load(&source)
      .set_name(format!("@{}", path.display()))
      .set_environment(env.clone())
      .eval::<LuaValue>()
      .map_err(|e| descriptor_error(e.to_string()))?;

    let namespace = match result {
      LuaValue::Table(t) => t,
      _ => env,
    };

    let field = |name: &str| -> Result<Option<String>, LoadError> {
      match namespace.get::<LuaValue>(name)? {
        LuaValue::Nil => Ok(None),
        LuaValue::String(s) => Ok(Some(s.to_str()?.to_string())),
        other => Err(descriptor_error(format!(
          "'{}' must be a string, got {}",
          name,
          other.type_name()
        ))),
      }
    };

    Ok(DescriptorFields {
      repository: field("repository")?,
      source_dir: field("source_dir")?,
    })
  }
}

fn script_error(origin: &Path, err: LuaError) -> LoadError {
  match module_error(&err) {
    Some(source) => LoadError::Declaration {
      path: origin.to_path_buf(),
      source: source.clone(),
    },
    None => LoadError::Script {
      path: origin.to_path_buf(),
      source: err,
    },
  }
}

fn read_namespace(namespace: &LuaTable) -> Result<Definition, String> {
  let name = match namespace.get::<LuaValue>("name").map_err(|e| e.to_string())? {
    LuaValue::String(s) => Some(String::from(s.to_string_lossy())),
    LuaValue::Nil => None,
    other => return Err(format!("'name' must be a string, got {}", other.type_name())),
  };

  let version = namespace.get::<LuaValue>("version").map_err(|e| e.to_string())?;
  let version = version_from_lua(&version).map_err(|e| e.to_string())?;

  Ok(Definition { name, version })
}

/// Interpret a Lua value as a module version; `nil` means "not declared".
pub fn version_from_lua(value: &LuaValue) -> Result<Option<ModuleVersion>, ModuleError> {
  let invalid = |value: String, reason: &str| ModuleError::InvalidVersion {
    value,
    reason: reason.to_string(),
  };

  match value {
    LuaValue::Nil => Ok(None),
    LuaValue::Integer(i) => u64::try_from(*i)
      .map(|v| Some(ModuleVersion::from(v)))
      .map_err(|_| invalid(i.to_string(), "versions cannot be negative")),
    LuaValue::Number(n) => {
      if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 {
        Ok(Some(ModuleVersion::from(*n as u64)))
      } else {
        Err(invalid(n.to_string(), "numeric versions must be non-negative integers"))
      }
    }
    LuaValue::String(s) => ModuleVersion::parse(&String::from(s.to_string_lossy())).map(Some),
    LuaValue::Table(t) => {
      let mut components = Vec::new();
      for item in t.clone().sequence_values::<LuaValue>() {
        let item = item.map_err(|e| invalid("table".to_string(), &e.to_string()))?;
        match version_from_lua(&item)? {
          Some(v) if v.components().len() == 1 => components.push(v.components()[0]),
          _ => return Err(invalid("table".to_string(), "version arrays must hold single integers")),
        }
      }
      ModuleVersion::from_components(components).map(Some)
    }
    other => Err(invalid(other.type_name().to_string(), "unsupported version type")),
  }
}

/// Resolve a descriptor path field against the repository directory.
pub fn resolve_against(base: &Path, value: &str) -> PathBuf {
  let path = Path::new(value);
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}
