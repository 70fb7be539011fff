//! Builder functions exposed to module definitions.
//!
//! Every definition script gets these functions in its environment, each bound
//! to the one module that script is building:
//!
//! - `source_directory()` - the module's source directory
//! - `add_include_dirs(...)` - module-wide include directories
//! - `add_compiler_flags(...)` - module-wide compiler flags
//! - `add_files(...)` - source files, relative to `source_directory()`
//! - `add_prebuild_step(step, outputs, dependencies)` - a pre-build function
//! - `add_file_include_dirs(file, ...)` - include directories for one file
//! - `add_file_flags(file, ...)` - compiler flags for one file
//!
//! Variadic arguments accept strings or arrays of strings, flattened in order.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use super::hooks::LuaAction;
use crate::action::{ActionHandle, PrebuildStep};
use crate::module::{Module, ModuleError};

/// The module a script's builder functions write to.
///
/// Holds the module while its definition or configure hook runs and is empty
/// otherwise, which is what seals the module against late declarations.
pub type ModuleSlot = Rc<RefCell<Option<Module>>>;

/// Names of the builder functions, in the order they are registered.
pub const BUILDER_FUNCTIONS: &[&str] = &[
  "source_directory",
  "add_include_dirs",
  "add_compiler_flags",
  "add_files",
  "add_prebuild_step",
  "add_file_include_dirs",
  "add_file_flags",
];

fn with_module<R>(slot: &ModuleSlot, f: impl FnOnce(&mut Module) -> Result<R, ModuleError>) -> LuaResult<R> {
  let mut guard = slot.borrow_mut();
  let module = guard.as_mut().ok_or_else(|| LuaError::external(ModuleError::Sealed))?;
  f(module).map_err(LuaError::external)
}

fn push_strings(value: LuaValue, what: &str, out: &mut Vec<String>) -> LuaResult<()> {
  match value {
    LuaValue::String(s) => out.push(s.to_str()?.to_string()),
    LuaValue::Table(t) => {
      for item in t.sequence_values::<LuaValue>() {
        push_strings(item?, what, out)?;
      }
    }
    LuaValue::Nil => {}
    other => {
      return Err(LuaError::external(format!(
        "{} expects strings or arrays of strings, got {}",
        what,
        other.type_name()
      )));
    }
  }
  Ok(())
}

/// Flatten variadic string arguments.
pub fn collect_strings(values: LuaVariadic<LuaValue>, what: &str) -> LuaResult<Vec<String>> {
  let mut out = Vec::new();
  for value in values {
    push_strings(value, what, &mut out)?;
  }
  Ok(out)
}

/// Register the builder functions in `env`, bound to `slot`.
pub fn register_builder(lua: &Lua, env: &LuaTable, slot: ModuleSlot) -> LuaResult<()> {
  let s = slot.clone();
  let source_directory = lua.create_function(move |_, ()| {
    with_module(&s, |module| Ok(module.source_dir().to_string_lossy().into_owned()))
  })?;
  env.set("source_directory", source_directory)?;

  let s = slot.clone();
  let add_include_dirs = lua.create_function(move |_, dirs: LuaVariadic<LuaValue>| {
    let dirs = collect_strings(dirs, "add_include_dirs")?;
    debug!(?dirs, "add_include_dirs");
    with_module(&s, |module| {
      module.add_include_dirs(dirs);
      Ok(())
    })
  })?;
  env.set("add_include_dirs", add_include_dirs)?;

  let s = slot.clone();
  let add_compiler_flags = lua.create_function(move |_, flags: LuaVariadic<LuaValue>| {
    let flags = collect_strings(flags, "add_compiler_flags")?;
    debug!(?flags, "add_compiler_flags");
    with_module(&s, |module| {
      module.add_compiler_flags(flags);
      Ok(())
    })
  })?;
  env.set("add_compiler_flags", add_compiler_flags)?;

  let s = slot.clone();
  let add_files = lua.create_function(move |_, files: LuaVariadic<LuaValue>| {
    let files = collect_strings(files, "add_files")?;
    debug!(?files, "add_files");
    with_module(&s, |module| module.add_files(files))
  })?;
  env.set("add_files", add_files)?;

  let s = slot.clone();
  let add_prebuild_step = lua.create_function(
    move |lua, (step, outputs, dependencies): (LuaFunction, Option<LuaValue>, Option<LuaValue>)| {
      let mut prebuild = PrebuildStep::new(ActionHandle::new(LuaAction::new(lua.clone(), step)));
      if let Some(outputs) = outputs {
        push_strings(outputs, "add_prebuild_step outputs", &mut prebuild.outputs)?;
      }
      if let Some(dependencies) = dependencies {
        push_strings(dependencies, "add_prebuild_step dependencies", &mut prebuild.dependencies)?;
      }
      debug!(outputs = ?prebuild.outputs, dependencies = ?prebuild.dependencies, "add_prebuild_step");
      with_module(&s, |module| {
        module.add_prebuild_step(prebuild);
        Ok(())
      })
    },
  )?;
  env.set("add_prebuild_step", add_prebuild_step)?;

  let s = slot.clone();
  let add_file_include_dirs = lua.create_function(move |_, (file, dirs): (String, LuaVariadic<LuaValue>)| {
    let dirs = collect_strings(dirs, "add_file_include_dirs")?;
    debug!(%file, ?dirs, "add_file_include_dirs");
    with_module(&s, |module| module.add_file_include_dirs(&file, dirs))
  })?;
  env.set("add_file_include_dirs", add_file_include_dirs)?;

  let s = slot;
  let add_file_flags = lua.create_function(move |_, (file, flags): (String, LuaVariadic<LuaValue>)| {
    let flags = collect_strings(flags, "add_file_flags")?;
    debug!(%file, ?flags, "add_file_flags");
    with_module(&s, |module| module.add_file_compiler_flags(&file, flags))
  })?;
  env.set("add_file_flags", add_file_flags)?;

  Ok(())
}
