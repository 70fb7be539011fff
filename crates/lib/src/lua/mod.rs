//! Sandboxed Lua execution of module definitions.
//!
//! # Submodules
//!
//! - [`runtime`] - Lua state creation and per-script sandbox environments
//! - [`globals`] - Builder functions bound to the module being defined
//! - [`hooks`] - Lua-backed pre-build steps and configure hooks
//! - [`loaders`] - Definition and repository-descriptor loading

pub mod globals;
pub mod hooks;
pub mod loaders;
pub mod runtime;

pub use loaders::DefinitionLoader;
