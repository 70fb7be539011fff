//! Names shared across the crate.

/// Repository descriptor file expected at the root of every repository directory.
pub const DESCRIPTOR_FILE: &str = "ctor.cfg";

/// Subdirectory of a repository holding its module definitions.
pub const MODULES_DIR: &str = "modules";

/// Extension of module-definition scripts.
pub const DEFINITION_EXT: &str = "ctor";

/// Environment variable with extra repository directories, in platform path-list syntax.
pub const MODULE_PATH_ENV: &str = "CTOR_MODULE_PATH";
