//! Configuration file loading
//!
//! A configuration file holds one flag per line, written as on the command
//! line without the leading introducer:
//!
//! ```text
//! http=localhost:8080
//! verbose
//! ```
//!
//! Each line becomes one token by prepending the parser's introducer. Lines
//! are not trimmed and blank lines are kept, so a blank line turns into a
//! bare introducer.

use crate::config::paths::ConfigPaths;
use crate::error::{ConflagError, Result};
use crate::flag::FlagParser;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which configuration file a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLayer {
    Global,
    User,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::User => write!(f, "user"),
        }
    }
}

/// A configuration file that was applied to the flag parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    pub tokens: usize,
}

/// Read a configuration file into flag tokens.
///
/// `None` and a missing file both yield no tokens. Any other failure to open
/// or read the file is an error.
pub fn read_config(path: Option<&Path>, prefix: &str) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("config file {} does not exist", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(ConflagError::config_open(path, e)),
    };

    let mut tokens = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ConflagError::config_read(path, e))?;
        tokens.push(format!("{}{}", prefix, line));
    }
    Ok(tokens)
}

/// Apply the global and then the user configuration file to `parser`.
///
/// Each file is parsed in its own pass, so values from the user file
/// overwrite values from the global file. Files without tokens are skipped.
pub fn load_layers<P>(parser: &mut P, paths: &ConfigPaths, prog: &str) -> Result<Vec<ConfigSource>>
where
    P: FlagParser + ?Sized,
{
    let layers = [
        (ConfigLayer::Global, paths.global_config_path(prog)),
        (ConfigLayer::User, paths.user_config_path(prog)),
    ];

    let mut applied = Vec::new();
    for (layer, path) in layers {
        let Some(path) = path else {
            debug!("no {} config path for {:?}", layer, prog);
            continue;
        };

        let tokens = read_config(Some(&path), parser.flag_prefix())?;
        if tokens.is_empty() {
            continue;
        }

        info!("applying {} config {} ({} entries)", layer, path.display(), tokens.len());
        parser.parse_args(&tokens)?;
        applied.push(ConfigSource {
            layer,
            path,
            tokens: tokens.len(),
        });
    }

    Ok(applied)
}
