//! Configuration file locations
//!
//! A program named `mycmd` reads `/etc/mycmd` and then `~/.mycmd`.

use crate::error::{ConflagError, Result};
use std::path::{is_separator, PathBuf};
use tracing::debug;

/// System-wide configuration directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc";

/// Reject program names that would escape the configuration directories.
pub fn validate_prog_name(name: &str) -> Result<()> {
    if name.chars().any(is_separator) {
        return Err(ConflagError::invalid_program_name(name));
    }
    Ok(())
}

/// Directories the global and per-user configuration files live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    system_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn new<P: Into<PathBuf>>(system_dir: P, home_dir: Option<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            home_dir,
        }
    }

    /// Use `/etc` and the current user's home directory.
    ///
    /// A home directory that cannot be resolved disables the per-user file.
    pub fn detect() -> Self {
        let home_dir = dirs::home_dir();
        if home_dir.is_none() {
            debug!("home directory could not be resolved; skipping user config");
        }
        Self::new(SYSTEM_CONFIG_DIR, home_dir)
    }

    pub fn system_dir(&self) -> &std::path::Path {
        &self.system_dir
    }

    pub fn home_dir(&self) -> Option<&std::path::Path> {
        self.home_dir.as_deref()
    }

    /// `<system_dir>/<prog>`, or `None` without a program name.
    pub fn global_config_path(&self, prog: &str) -> Option<PathBuf> {
        if prog.is_empty() {
            return None;
        }
        Some(self.system_dir.join(prog))
    }

    /// `<home>/.<prog>`, or `None` without a program name or home directory.
    pub fn user_config_path(&self, prog: &str) -> Option<PathBuf> {
        if prog.is_empty() {
            return None;
        }
        self.home_dir
            .as_ref()
            .map(|home| home.join(format!(".{}", prog)))
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::detect()
    }
}
