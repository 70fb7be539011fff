//! ctor-lib: Build configuration front end for ctor
//!
//! This crate turns module definition scripts into a build plan:
//! - `Module`: a named, versioned unit of compilable source files
//! - `Registry`: one module per name, highest version wins
//! - `DefinitionLoader`: runs `.ctor` definition scripts in a Lua sandbox
//! - `build`: loads repositories, configures modules, runs pre-build steps

pub mod action;
pub mod build;
pub mod config;
pub mod consts;
pub mod eval;
pub mod lua;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod repository;
