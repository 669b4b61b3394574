//! Layered flag parsing context
//!
//! `Conflag` ties a program name, the configuration file locations and a
//! [`FlagSet`] together. Callers define flags on it exactly as on a flag
//! set, name the program, then call [`Conflag::parse`]:
//!
//! ```no_run
//! use conflag::Conflag;
//!
//! # fn main() -> conflag::Result<()> {
//! let mut flags = Conflag::new();
//! let http = flags.string("http", "localhost:8080", "listen address")?;
//! flags.set_prog_name("mycmd")?;
//! flags.parse()?;
//! println!("listening on {}", http.get());
//! # Ok(())
//! # }
//! ```
//!
//! Values are applied from `/etc/mycmd`, then `~/.mycmd`, then the command
//! line, each pass overwriting the one before.

use crate::config::loader::{load_layers, ConfigSource};
use crate::config::paths::{validate_prog_name, ConfigPaths};
use crate::error::{ConflagError, FlagError, Result};
use crate::flag::{ErrorHandling, FlagInfo, FlagSet, FlagValue, UsageFn, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Owns the program name, config locations and flag registry.
#[derive(Debug)]
pub struct Conflag {
    prog_name: Option<String>,
    paths: ConfigPaths,
    flags: FlagSet,
    sources: Vec<ConfigSource>,
}

impl Default for Conflag {
    fn default() -> Self {
        Self::new()
    }
}

impl Conflag {
    /// Flag set named after the invoked binary that exits on parse errors,
    /// with the standard configuration locations.
    pub fn new() -> Self {
        let invoked = std::env::args().next().unwrap_or_else(|| "conflag".to_string());
        Self::with_flag_set(
            FlagSet::new(invoked, ErrorHandling::ExitOnError),
            ConfigPaths::detect(),
        )
    }

    pub fn with_flag_set(flags: FlagSet, paths: ConfigPaths) -> Self {
        Self {
            prog_name: None,
            paths,
            flags,
            sources: Vec::new(),
        }
    }

    /// Set the name used to locate configuration files.
    ///
    /// Without a program name no configuration files are read. The name may
    /// be set once and must not contain a path separator.
    pub fn set_prog_name<S: Into<String>>(&mut self, name: S) -> Result<()> {
        let name = name.into();
        validate_prog_name(&name)?;
        if let Some(current) = &self.prog_name {
            return Err(ConflagError::program_name_already_set(current.clone()));
        }
        debug!("program name set to {:?}", name);
        self.prog_name = Some(name);
        Ok(())
    }

    pub fn prog_name(&self) -> Option<&str> {
        self.prog_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// System-wide configuration file, `/etc/<prog>`.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.paths.global_config_path(self.prog_name()?)
    }

    /// Per-user configuration file, `~/.<prog>`.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.paths.user_config_path(self.prog_name()?)
    }

    /// Configuration files applied by the last parse.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Parse configuration files and then `std::env::args()`.
    pub fn parse(&mut self) -> Result<()> {
        self.parse_from(std::env::args().skip(1))
    }

    /// Parse configuration files and then `args` (without the program name).
    ///
    /// A configuration file that cannot be read stops before the command
    /// line is looked at.
    pub fn parse_from<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(prog) = self.prog_name.clone().filter(|name| !name.is_empty()) {
            self.sources = load_layers(&mut self.flags, &self.paths, &prog)?;
        }
        self.flags.parse(args)?;
        Ok(())
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    pub fn into_flags(self) -> FlagSet {
        self.flags
    }

    pub fn bool(&mut self, name: &str, value: bool, usage: &str) -> Result<FlagValue<bool>> {
        self.flags.bool(name, value, usage)
    }

    pub fn int(&mut self, name: &str, value: isize, usage: &str) -> Result<FlagValue<isize>> {
        self.flags.int(name, value, usage)
    }

    pub fn int64(&mut self, name: &str, value: i64, usage: &str) -> Result<FlagValue<i64>> {
        self.flags.int64(name, value, usage)
    }

    pub fn uint(&mut self, name: &str, value: usize, usage: &str) -> Result<FlagValue<usize>> {
        self.flags.uint(name, value, usage)
    }

    pub fn uint64(&mut self, name: &str, value: u64, usage: &str) -> Result<FlagValue<u64>> {
        self.flags.uint64(name, value, usage)
    }

    pub fn float64(&mut self, name: &str, value: f64, usage: &str) -> Result<FlagValue<f64>> {
        self.flags.float64(name, value, usage)
    }

    pub fn string(&mut self, name: &str, value: &str, usage: &str) -> Result<FlagValue<String>> {
        self.flags.string(name, value, usage)
    }

    pub fn duration(&mut self, name: &str, value: Duration, usage: &str) -> Result<FlagValue<Duration>> {
        self.flags.duration(name, value, usage)
    }

    pub fn var<V: Value + 'static>(&mut self, value: V, name: &str, usage: &str) -> Result<FlagValue<V>> {
        self.flags.var(value, name, usage)
    }

    pub fn lookup(&self, name: &str) -> Option<FlagInfo> {
        self.flags.lookup(name)
    }

    pub fn set(&mut self, name: &str, value: &str) -> std::result::Result<(), FlagError> {
        self.flags.set(name, value)
    }

    pub fn arg(&self, i: usize) -> Option<&str> {
        self.flags.arg(i)
    }

    pub fn args(&self) -> &[String] {
        self.flags.args()
    }

    pub fn narg(&self) -> usize {
        self.flags.narg()
    }

    pub fn nflag(&self) -> usize {
        self.flags.nflag()
    }

    pub fn parsed(&self) -> bool {
        self.flags.parsed()
    }

    pub fn print_defaults(&self) {
        self.flags.print_defaults()
    }

    pub fn set_usage(&mut self, usage: UsageFn) {
        self.flags.set_usage(usage)
    }

    pub fn usage(&self) {
        self.flags.usage()
    }
}

/// Create an empty flag set for custom use.
pub fn new_flag_set<S: Into<String>>(name: S, error_handling: ErrorHandling) -> FlagSet {
    FlagSet::new(name, error_handling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn conflag_in(tmp: &TempDir) -> Conflag {
        let etc = tmp.path().join("etc");
        let home = tmp.path().join("home");
        fs::create_dir_all(&etc).expect("etc");
        fs::create_dir_all(&home).expect("home");
        Conflag::with_flag_set(
            new_flag_set("test", ErrorHandling::ContinueOnError),
            ConfigPaths::new(etc, Some(home)),
        )
    }

    #[test]
    fn test_prog_name_set_once() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        assert!(cf.prog_name().is_none());
        cf.set_prog_name("mycmd").expect("set");
        assert_eq!(cf.prog_name(), Some("mycmd"));

        let err = cf.set_prog_name("other").unwrap_err();
        assert!(matches!(err, ConflagError::ProgramNameAlreadySet { .. }));
        assert_eq!(cf.prog_name(), Some("mycmd"));
    }

    #[test]
    fn test_prog_name_with_separator_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        let err = cf.set_prog_name("bin/mycmd").unwrap_err();
        assert!(matches!(err, ConflagError::InvalidProgramName { .. }));
        assert!(cf.prog_name().is_none());
    }

    #[test]
    fn test_config_paths_follow_prog_name() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        assert!(cf.global_config_path().is_none());
        assert!(cf.user_config_path().is_none());

        cf.set_prog_name("mycmd").expect("set");
        assert_eq!(cf.global_config_path(), Some(tmp.path().join("etc").join("mycmd")));
        assert_eq!(cf.user_config_path(), Some(tmp.path().join("home").join(".mycmd")));
    }

    #[test]
    fn test_parse_layers_and_records_sources() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        let a = cf.int("a", 0, "").expect("a");
        cf.set_prog_name("mycmd").expect("set");
        fs::write(tmp.path().join("etc/mycmd"), "a=1\n").expect("write");
        fs::write(tmp.path().join("home/.mycmd"), "a=2\n").expect("write");

        cf.parse_from(Vec::<String>::new()).expect("parse");
        assert_eq!(a.get(), 2);
        assert_eq!(cf.sources().len(), 2);
        assert!(cf.parsed());
    }

    #[test]
    fn test_open_failure_stops_before_command_line() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        let a = cf.int("a", 0, "").expect("a");
        cf.set_prog_name("mycmd").expect("set");
        fs::remove_dir_all(tmp.path().join("home")).expect("rm");
        fs::write(tmp.path().join("home"), "plain file").expect("write");

        let err = cf.parse_from(["--a=3"]).unwrap_err();
        assert!(matches!(err, ConflagError::ConfigOpen { .. }));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(a.get(), 0);
        assert!(!cf.parsed());
    }

    #[test]
    fn test_facade_delegates_read_back() {
        let tmp = TempDir::new().expect("tmp");
        let mut cf = conflag_in(&tmp);
        cf.bool("verbose", false, "verbose output").expect("verbose");
        cf.parse_from(["--verbose", "file1", "file2"]).expect("parse");

        assert_eq!(cf.nflag(), 1);
        assert_eq!(cf.narg(), 2);
        assert_eq!(cf.arg(1), Some("file2"));
        assert_eq!(cf.args(), ["file1", "file2"]);
        assert_eq!(cf.lookup("verbose").map(|f| f.value), Some("true".to_string()));

        cf.set("verbose", "false").expect("set");
        assert_eq!(cf.lookup("verbose").map(|f| f.value), Some("false".to_string()));
    }
}
