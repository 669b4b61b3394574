//! Flag registry
//!
//! Flag definitions, typed value handles and the clap-backed parser that
//! the configuration loader feeds in layered passes.

pub mod set;
pub mod value;

pub use set::{ErrorHandling, FlagInfo, FlagParser, FlagSet, UsageFn, FLAG_PREFIX};
pub use value::{FlagValue, Value};
