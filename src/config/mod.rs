//! Configuration file layering
//!
//! This module resolves the global and per-user configuration files for a
//! program name, turns their lines into flag tokens and feeds them to the
//! flag registry ahead of the command line.

pub mod context;
pub mod loader;
pub mod paths;

pub use context::*;
pub use loader::{load_layers, read_config, ConfigLayer, ConfigSource};
pub use paths::*;
