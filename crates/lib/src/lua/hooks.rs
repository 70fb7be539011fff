//! Lua-backed actions and configure hooks.

use mlua::prelude::*;
use mlua::{LuaSerdeExt, SerializeOptions};

use super::globals::ModuleSlot;
use crate::action::{Action, Configure, StepError};
use crate::module::{Module, ModuleError};

/// Find a [`ModuleError`] raised by a builder function inside a Lua error chain.
pub fn module_error(err: &LuaError) -> Option<&ModuleError> {
  match err {
    LuaError::ExternalError(inner) => inner.downcast_ref::<ModuleError>(),
    LuaError::CallbackError { cause, .. } => module_error(cause),
    LuaError::WithContext { cause, .. } => module_error(cause),
    _ => None,
  }
}

/// Convert a Lua failure into a step error, keeping a typed [`ModuleError`] when
/// the failure came from a builder function.
fn step_error(err: LuaError) -> StepError {
  match module_error(&err) {
    Some(module_err) => Box::new(module_err.clone()),
    None => Box::new(err),
  }
}

/// Convert a module's JSON options into the value `configure` receives.
///
/// A `null` selection becomes an empty table and nested `null`s become `nil`,
/// so scripts can index options and test fields without nil checks.
fn options_to_lua(lua: &Lua, options: &serde_json::Value) -> LuaResult<LuaValue> {
  if options.is_null() {
    return lua.create_table().map(LuaValue::Table);
  }
  let serialize = SerializeOptions::new()
    .serialize_none_to_null(false)
    .serialize_unit_to_null(false);
  lua.to_value_with(options, serialize)
}

/// A pre-build step implemented by a Lua function taking no arguments.
///
/// Holds its own handle to the Lua state so the step can run after the loader
/// that created it is gone.
pub struct LuaAction {
  _lua: Lua,
  func: LuaFunction,
}

impl LuaAction {
  pub fn new(lua: Lua, func: LuaFunction) -> Self {
    Self { _lua: lua, func }
  }
}

impl Action for LuaAction {
  fn run(&self) -> Result<(), StepError> {
    self.func.call::<()>(()).map_err(step_error)
  }
}

/// A definition's `configure(options)` function.
///
/// While the hook runs, the module is moved back into the slot its builder
/// functions are bound to, so `configure` can keep declaring files, flags and
/// steps for the module being configured.
pub struct LuaConfigure {
  lua: Lua,
  func: LuaFunction,
  slot: ModuleSlot,
}

impl LuaConfigure {
  pub fn new(lua: Lua, func: LuaFunction, slot: ModuleSlot) -> Self {
    Self { lua, func, slot }
  }
}

impl Configure for LuaConfigure {
  fn configure(&self, module: &mut Module, options: &serde_json::Value) -> Result<(), StepError> {
    let options = options_to_lua(&self.lua, options).map_err(step_error)?;

    self.slot.replace(Some(std::mem::take(module)));
    let result = self.func.call::<()>(options);
    if let Some(reopened) = self.slot.borrow_mut().take() {
      *module = reopened;
    }

    result.map_err(step_error)
  }
}
