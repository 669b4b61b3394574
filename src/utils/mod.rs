//! Utility functions module
//!
//! Parsing helpers shared by the flag value types.

pub mod duration;

pub use duration::*;
