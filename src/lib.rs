//! conflag - flag parsing with configuration file defaults
//!
//! Fills flag values from `/etc/<prog>` and `~/.<prog>` before parsing
//! the command line, so real arguments override the files.

pub mod config;
pub mod error;
pub mod flag;
pub mod utils;

// Re-export commonly used types
pub use config::{new_flag_set, ConfigPaths, Conflag};
pub use error::{ConflagError, FlagError, Result};
pub use flag::{ErrorHandling, FlagInfo, FlagParser, FlagSet, FlagValue, Value};
