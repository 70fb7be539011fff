//! The module model: compile files, modules and their versions.
//!
//! Modules are produced by the definition loader ([`crate::lua`]), owned by the
//! [`crate::registry::Registry`] once registered, and handed to the compile
//! driver through [`crate::manifest::BuildManifest`].

mod types;
mod version;

pub use types::*;
pub use version::ModuleVersion;
