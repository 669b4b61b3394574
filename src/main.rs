//! conflag - show how flags resolve across configuration layers
//!
//! Reads `/etc/conflag`, then `~/.conflag`, then the command line, and
//! prints the effective value of every flag.

use anyhow::{bail, Context};
use conflag::config::ConfigSource;
use conflag::{Conflag, ConflagError, FlagInfo, Value};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tabled::Table;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PROG_NAME: &str = "conflag";

/// Comma-separated list that accumulates across occurrences.
#[derive(Debug, Default)]
struct Tags(Vec<String>);

impl Value for Tags {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        self.0.extend(
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string),
        );
        Ok(())
    }

    fn current(&self) -> String {
        self.0.join(",")
    }
}

#[derive(Serialize)]
struct Report {
    program: String,
    global_config: Option<PathBuf>,
    user_config: Option<PathBuf>,
    sources: Vec<ConfigSource>,
    flags: Vec<FlagInfo>,
    args: Vec<String>,
}

fn main() {
    init_logging();

    let mut flags = Conflag::new();
    if let Err(e) = run(&mut flags) {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<ConflagError>()
            .map(ConflagError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(flags: &mut Conflag) -> anyhow::Result<()> {
    let listen = flags.string("listen", "localhost:8080", "address to listen on")?;
    let timeout = flags.duration("timeout", Duration::from_secs(30), "request timeout")?;
    let workers = flags.uint("workers", 4, "number of worker threads")?;
    let tags = flags.var(Tags::default(), "tag", "comma-separated tags, may be repeated")?;
    let verbose = flags.bool("verbose", false, "list the configuration files that were applied")?;
    let format = flags.string("format", "table", "output format: table or json")?;
    let show_paths = flags.bool("show-paths", false, "print where configuration is looked up")?;

    flags.set_prog_name(PROG_NAME)?;
    flags.parse()?;

    info!(
        "listen={} timeout={:?} workers={} tags={:?}",
        listen.get(),
        timeout.get(),
        workers.get(),
        tags.with(|t| t.0.clone())
    );

    if show_paths.get() {
        println!("global config: {}", display_path(flags.global_config_path()));
        println!("user config:   {}", display_path(flags.user_config_path()));
    }

    if verbose.get() {
        if flags.sources().is_empty() {
            println!("no configuration files applied");
        }
        for source in flags.sources() {
            println!("applied {} config {} ({} entries)", source.layer, source.path.display(), source.tokens);
        }
    }

    let mut rows = Vec::new();
    flags.flags().visit_all(|info| rows.push(info.clone()));

    match format.get().as_str() {
        "table" => println!("{}", Table::new(&rows)),
        "json" => {
            let report = Report {
                program: PROG_NAME.to_string(),
                global_config: flags.global_config_path(),
                user_config: flags.user_config_path(),
                sources: flags.sources().to_vec(),
                flags: rows,
                args: flags.args().to_vec(),
            };
            let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            println!("{}", json);
        }
        other => bail!("unknown output format {:?} (expected table or json)", other),
    }

    Ok(())
}

fn display_path(path: Option<PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conflag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
