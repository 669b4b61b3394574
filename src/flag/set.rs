//! The flag registry
//!
//! `FlagSet` owns flag definitions and their current values and delegates
//! tokenizing to clap. The clap `Command` is rebuilt from the registry for
//! every pass and carries no defaults of its own, so a pass only touches the
//! flags that actually appear in it. Repeated passes over one `FlagSet`
//! therefore layer: later passes overwrite what earlier passes set.

use crate::error::{ConflagError, FlagError, Result};
use crate::flag::value::{FlagValue, Scalar, ScalarValue, SharedValue, Value};
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ColorChoice, Command};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::time::Duration;
use tabled::Tabled;
use tracing::{debug, trace};

/// Prefix that turns a bare `name=value` line into a flag token.
///
/// On the command line, flags with multi-character names must also be
/// written with `--` (`--verbose`); a single dash is read by clap as a
/// cluster of short flags, so `-verbose` is rejected. Single-character
/// names additionally accept `-a=3`, and single-character bool flags may
/// be clustered (`-ab` sets both `a` and `b`).
pub const FLAG_PREFIX: &str = "--";

/// Clap id holding the positional arguments left over by a pass.
const POSITIONAL_ID: &str = "\u{0}positional";

/// Clap id of the help flag, given whichever of `-h`/`--help` is free.
const HELP_ID: &str = "\u{0}help";

/// What a `FlagSet` does when a parse pass fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Return the error to the caller.
    ContinueOnError,
    /// Print the error and exit: status 0 for help, 2 otherwise.
    #[default]
    ExitOnError,
    /// Panic with the error message.
    PanicOnError,
}

/// Snapshot of a registered flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct FlagInfo {
    #[tabled(rename = "Flag")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub type_name: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Default")]
    pub default_value: String,
    #[tabled(rename = "Usage")]
    pub usage: String,
}

/// Callback invoked for `-h`/`--help` and after invalid values.
pub type UsageFn = Box<dyn Fn(&FlagSet)>;

struct Flag {
    usage: String,
    type_name: &'static str,
    default_value: String,
    value: Box<dyn Value>,
}

impl Flag {
    fn info(&self, name: &str) -> FlagInfo {
        FlagInfo {
            name: name.to_string(),
            type_name: self.type_name.to_string(),
            value: self.value.current(),
            default_value: self.default_value.clone(),
            usage: self.usage.clone(),
        }
    }

    fn to_arg(&self, name: &str) -> Arg {
        let mut help = self.usage.clone();
        if !is_zero_value(self.type_name, &self.default_value) {
            help.push_str(&format!(" [default: {}]", self.default_value));
        }

        let mut arg = Arg::new(name.to_string())
            .long(name.to_string())
            .help(help)
            .action(ArgAction::Append)
            .value_parser(value_parser!(String));

        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            arg = arg.short(c);
        }

        if self.value.is_bool_flag() {
            arg.num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_name("BOOL")
        } else {
            arg.num_args(1)
                .allow_hyphen_values(true)
                .value_name(self.type_name.to_uppercase())
        }
    }
}

fn is_zero_value(type_name: &str, value: &str) -> bool {
    matches!(
        (type_name, value),
        (_, "") | ("bool", "false") | ("int", "0") | ("uint", "0") | ("float", "0") | ("duration", "0s")
    )
}

/// A set of defined flags.
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    flags: BTreeMap<String, Flag>,
    actual: BTreeSet<String>,
    args: Vec<String>,
    parsed: bool,
    usage: Option<UsageFn>,
}

impl std::fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("flags", &self.flags.keys().collect::<Vec<_>>())
            .field("actual", &self.actual)
            .field("args", &self.args)
            .field("parsed", &self.parsed)
            .finish()
    }
}

impl FlagSet {
    /// Create an empty flag set with the given name and error policy.
    pub fn new<S: Into<String>>(name: S, error_handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            error_handling,
            flags: BTreeMap::new(),
            actual: BTreeSet::new(),
            args: Vec::new(),
            parsed: false,
            usage: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Define a bool flag. It may be given without a value to mean `true`.
    pub fn bool(&mut self, name: &str, value: bool, usage: &str) -> Result<FlagValue<bool>> {
        self.define_scalar(name, value, usage)
    }

    /// Define a pointer-width signed integer flag.
    pub fn int(&mut self, name: &str, value: isize, usage: &str) -> Result<FlagValue<isize>> {
        self.define_scalar(name, value, usage)
    }

    pub fn int64(&mut self, name: &str, value: i64, usage: &str) -> Result<FlagValue<i64>> {
        self.define_scalar(name, value, usage)
    }

    /// Define a pointer-width unsigned integer flag.
    pub fn uint(&mut self, name: &str, value: usize, usage: &str) -> Result<FlagValue<usize>> {
        self.define_scalar(name, value, usage)
    }

    pub fn uint64(&mut self, name: &str, value: u64, usage: &str) -> Result<FlagValue<u64>> {
        self.define_scalar(name, value, usage)
    }

    pub fn float64(&mut self, name: &str, value: f64, usage: &str) -> Result<FlagValue<f64>> {
        self.define_scalar(name, value, usage)
    }

    pub fn string(&mut self, name: &str, value: &str, usage: &str) -> Result<FlagValue<String>> {
        self.define_scalar(name, value.to_string(), usage)
    }

    /// Define a duration flag, written like `30s` or `1h15m`.
    pub fn duration(&mut self, name: &str, value: Duration, usage: &str) -> Result<FlagValue<Duration>> {
        self.define_scalar(name, value, usage)
    }

    /// Define a flag backed by a caller-supplied [`Value`].
    ///
    /// The current state of `value` becomes the flag's default. The returned
    /// handle shares storage with the registry.
    pub fn var<V: Value + 'static>(&mut self, value: V, name: &str, usage: &str) -> Result<FlagValue<V>> {
        let handle = FlagValue::new(value);
        self.insert(name, usage, "value", Box::new(SharedValue::new(handle.clone())))?;
        Ok(handle)
    }

    fn define_scalar<T: Scalar>(&mut self, name: &str, value: T, usage: &str) -> Result<FlagValue<T>> {
        let handle = FlagValue::new(value);
        self.insert(name, usage, T::TYPE_NAME, Box::new(ScalarValue::new(handle.clone())))?;
        Ok(handle)
    }

    fn insert(&mut self, name: &str, usage: &str, type_name: &'static str, value: Box<dyn Value>) -> Result<()> {
        if name.is_empty() {
            return Err(ConflagError::invalid_flag_name(name, "empty name"));
        }
        if name.starts_with('-') {
            return Err(ConflagError::invalid_flag_name(name, "flag name begins with -"));
        }
        if name.contains('=') {
            return Err(ConflagError::invalid_flag_name(name, "flag name contains ="));
        }
        if self.flags.contains_key(name) {
            return Err(ConflagError::flag_redefined(format!("{}: {}", self.name, name)));
        }

        let default_value = value.current();
        trace!("defined flag -{} ({}) default {:?}", name, type_name, default_value);
        self.flags.insert(
            name.to_string(),
            Flag {
                usage: usage.to_string(),
                type_name,
                default_value,
                value,
            },
        );
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.name.clone())
            .no_binary_name(true)
            .disable_version_flag(true)
            .disable_help_flag(true)
            .color(ColorChoice::Never);

        let short_free = !self.flags.contains_key("h");
        let long_free = !self.flags.contains_key("help");
        if short_free || long_free {
            let mut help = Arg::new(HELP_ID).action(ArgAction::Help).hide(true);
            if short_free {
                help = help.short('h');
            }
            if long_free {
                help = help.long("help");
            }
            cmd = cmd.arg(help);
        }

        for (name, flag) in &self.flags {
            cmd = cmd.arg(flag.to_arg(name));
        }

        cmd.arg(
            Arg::new(POSITIONAL_ID)
                .value_name("ARGS")
                .num_args(1..)
                .action(ArgAction::Append)
                .trailing_var_arg(true)
                .hide(true)
                .value_parser(value_parser!(String)),
        )
    }

    /// Run one parse pass over `args` (without the program name).
    ///
    /// Flags present in `args` overwrite their current values; all others
    /// keep theirs. Parsing stops at the first positional argument or `--`;
    /// what follows becomes [`FlagSet::args`]. On failure the configured
    /// [`ErrorHandling`] decides whether this returns, exits or panics.
    pub fn parse<I, S>(&mut self, args: I) -> std::result::Result<(), FlagError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parsed = true;
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match self.try_parse(&args) {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    fn try_parse(&mut self, args: &[String]) -> std::result::Result<(), FlagError> {
        let matches = self.command().try_get_matches_from(args).map_err(|err| {
            if err.kind() == ErrorKind::DisplayHelp {
                FlagError::Help
            } else {
                FlagError::Parse(err)
            }
        })?;

        self.args = matches
            .get_many::<String>(POSITIONAL_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        // Apply occurrences in command-line order so a bad value stops the
        // pass before any later token lands.
        let mut occurrences: Vec<(usize, String, String)> = Vec::new();
        for name in self.flags.keys() {
            let Some(values) = matches.get_many::<String>(name.as_str()) else {
                continue;
            };
            let indices: Vec<usize> = matches
                .indices_of(name.as_str())
                .map(|i| i.collect())
                .unwrap_or_default();
            for (k, raw) in values.enumerate() {
                let index = indices.get(k).copied().unwrap_or(usize::MAX);
                occurrences.push((index, name.clone(), raw.clone()));
            }
        }
        occurrences.sort_by_key(|(index, _, _)| *index);

        for (_, name, raw) in occurrences {
            let Some(flag) = self.flags.get_mut(&name) else {
                continue;
            };
            flag.value
                .set(&raw)
                .map_err(|reason| FlagError::invalid_value(name.as_str(), raw.as_str(), reason))?;
            self.actual.insert(name);
        }

        debug!(
            "parsed {} argument(s) for {}, {} positional",
            args.len(),
            self.name,
            self.args.len()
        );
        Ok(())
    }

    fn fail(&self, err: FlagError) -> std::result::Result<(), FlagError> {
        match &err {
            FlagError::Help => self.usage(),
            FlagError::Parse(_) => eprint!("{}", err),
            _ => {
                eprintln!("{}", err);
                self.usage();
            }
        }

        match self.error_handling {
            ErrorHandling::ContinueOnError => Err(err),
            ErrorHandling::ExitOnError => {
                let code = if matches!(err, FlagError::Help) { 0 } else { 2 };
                std::process::exit(code);
            }
            ErrorHandling::PanicOnError => panic!("{}", err),
        }
    }

    /// Set the named flag as if it had been parsed.
    pub fn set(&mut self, name: &str, value: &str) -> std::result::Result<(), FlagError> {
        let flag = self
            .flags
            .get_mut(name)
            .ok_or_else(|| FlagError::no_such_flag(name))?;
        flag.value
            .set(value)
            .map_err(|reason| FlagError::invalid_value(name, value, reason))?;
        self.actual.insert(name.to_string());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<FlagInfo> {
        self.flags.get(name).map(|flag| flag.info(name))
    }

    /// Visit every defined flag in lexicographic order.
    pub fn visit_all<F: FnMut(&FlagInfo)>(&self, mut f: F) {
        for (name, flag) in &self.flags {
            f(&flag.info(name));
        }
    }

    /// Visit only the flags that have been set, in lexicographic order.
    pub fn visit<F: FnMut(&FlagInfo)>(&self, mut f: F) {
        for name in &self.actual {
            if let Some(flag) = self.flags.get(name) {
                f(&flag.info(name));
            }
        }
    }

    /// Number of distinct flags set by any pass or by [`FlagSet::set`].
    pub fn nflag(&self) -> usize {
        self.actual.len()
    }

    /// The i'th positional argument left by the latest pass.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    pub fn narg(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn parsed(&self) -> bool {
        self.parsed
    }

    pub fn set_usage(&mut self, usage: UsageFn) {
        self.usage = Some(usage);
    }

    /// Invoke the usage callback, or print the default usage message.
    pub fn usage(&self) {
        match &self.usage {
            Some(callback) => callback(self),
            None => {
                eprintln!("Usage of {}:", self.name);
                self.print_defaults();
            }
        }
    }

    /// Print the flag defaults to standard error.
    pub fn print_defaults(&self) {
        if let Err(e) = self.write_defaults(&mut io::stderr()) {
            debug!("failed to print flag defaults: {}", e);
        }
    }

    /// Write the flag listing, rendered by clap, to `out`.
    pub fn write_defaults<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        let help = self.command().help_template("{options}\n").render_help();
        write!(out, "{}", help)
    }
}

/// A parser that accepts argument tokens in layered passes.
#[cfg_attr(test, mockall::automock)]
pub trait FlagParser {
    /// Introducer prepended to each configuration line.
    fn flag_prefix(&self) -> &'static str;

    /// Run one parse pass over `args`.
    fn parse_args(&mut self, args: &[String]) -> std::result::Result<(), FlagError>;
}

impl FlagParser for FlagSet {
    fn flag_prefix(&self) -> &'static str {
        FLAG_PREFIX
    }

    fn parse_args(&mut self, args: &[String]) -> std::result::Result<(), FlagError> {
        self.parse(args.iter().cloned())
    }
}
