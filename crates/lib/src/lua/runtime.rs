//! Sandboxed Lua state and per-script environments.
//!
//! The runtime only opens side-effect-free standard libraries. Scripts never see
//! the state's globals directly: each one runs with its own environment table
//! holding a whitelist of pure helpers, copies of the pure libraries, and
//! whatever builder functions the caller adds.

use mlua::prelude::*;
use mlua::{LuaOptions, StdLib};

/// Base functions copied into every script environment.
///
/// `setmetatable` is left out: a `__gc` finalizer would run builder functions
/// outside the script that declared it.
const SAFE_GLOBALS: &[&str] = &[
  "assert",
  "error",
  "ipairs",
  "next",
  "pairs",
  "pcall",
  "rawequal",
  "rawget",
  "rawlen",
  "rawset",
  "select",
  "tonumber",
  "tostring",
  "type",
  "xpcall",
];

/// Libraries copied (shallowly) into every script environment.
const SAFE_LIBRARIES: &[&str] = &["math", "string", "table", "utf8"];

/// Base library entries that can reach the file system or compile code.
const STRIPPED_GLOBALS: &[&str] = &["collectgarbage", "dofile", "load", "loadfile", "print"];

/// Create a Lua state with only the pure standard libraries loaded.
pub fn create_runtime() -> LuaResult<Lua> {
  let lua = Lua::new_with(
    StdLib::MATH | StdLib::STRING | StdLib::TABLE | StdLib::UTF8,
    LuaOptions::default(),
  )?;

  let globals = lua.globals();
  for name in STRIPPED_GLOBALS {
    globals.set(*name, LuaValue::Nil)?;
  }

  Ok(lua)
}

/// Build a fresh environment table for one script.
///
/// Library tables are copied so that one script patching `string` or `table`
/// cannot change what another script sees.
pub fn create_environment(lua: &Lua) -> LuaResult<LuaTable> {
  let globals = lua.globals();
  let env = lua.create_table()?;

  for name in SAFE_GLOBALS {
    let value: LuaValue = globals.get(*name)?;
    if !value.is_nil() {
      env.set(*name, value)?;
    }
  }

  for name in SAFE_LIBRARIES {
    if let Some(lib) = globals.get::<Option<LuaTable>>(*name)? {
      env.set(*name, shallow_copy(lua, &lib)?)?;
    }
  }

  env.set("_G", env.clone())?;
  Ok(env)
}

fn shallow_copy(lua: &Lua, table: &LuaTable) -> LuaResult<LuaTable> {
  let copy = lua.create_table()?;
  table.for_each(|k: LuaValue, v: LuaValue| copy.set(k, v))?;
  Ok(copy)
}
