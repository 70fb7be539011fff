//! Build manifest handed to the compile driver.
//!
//! The manifest is a serializable snapshot of the registry after the
//! Configuring phase: which modules won, which files they compile and with
//! which effective flags and include directories.

mod types;

pub use types::*;
