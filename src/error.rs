use std::path::PathBuf;
use thiserror::Error;

/// Main error type for conflag operations
#[derive(Debug, Error)]
pub enum ConflagError {
    #[error("bad program name {name:?}: must not contain a path separator")]
    InvalidProgramName { name: String },

    #[error("program name already set to {current:?}")]
    ProgramNameAlreadySet { current: String },

    #[error("flag redefined: {name}")]
    FlagRedefined { name: String },

    #[error("invalid flag name {name:?}: {reason}")]
    InvalidFlagName { name: String, reason: String },

    #[error("error opening config file {path:?}: {source}")]
    ConfigOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Flag(#[from] FlagError),
}

/// Errors raised by the flag registry while parsing or setting values
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag: help requested")]
    Help,

    #[error("{0}")]
    Parse(#[from] clap::Error),

    #[error("invalid value {value:?} for flag -{flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("no such flag -{name}")]
    NoSuchFlag { name: String },
}

impl ConflagError {
    pub fn invalid_program_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidProgramName { name: name.into() }
    }

    pub fn program_name_already_set<S: Into<String>>(current: S) -> Self {
        Self::ProgramNameAlreadySet {
            current: current.into(),
        }
    }

    pub fn flag_redefined<S: Into<String>>(name: S) -> Self {
        Self::FlagRedefined { name: name.into() }
    }

    pub fn invalid_flag_name<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        Self::InvalidFlagName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn config_open<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::ConfigOpen {
            path: path.into(),
            source,
        }
    }

    pub fn config_read<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Process exit status matching the conventional flag-parser behavior:
    /// 0 when help was requested, 2 for every other failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Flag(FlagError::Help) => 0,
            _ => 2,
        }
    }

    pub fn is_help(&self) -> bool {
        matches!(self, Self::Flag(FlagError::Help))
    }
}

impl FlagError {
    pub fn invalid_value<F, V, R>(flag: F, value: V, reason: R) -> Self
    where
        F: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        Self::InvalidValue {
            flag: flag.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn no_such_flag<S: Into<String>>(name: S) -> Self {
        Self::NoSuchFlag { name: name.into() }
    }
}

/// Result type alias for conflag operations
pub type Result<T> = std::result::Result<T, ConflagError>;
