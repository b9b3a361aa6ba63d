//! Tracing setup for the CLI.
//!
//! A verbosity level picks a baseline for the `datachat::` targets, `--log`
//! adds per-target overrides, and `RUST_LOG` replaces both when set. Output
//! always goes to stderr so rendered transcripts on stdout can be piped.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Dependency targets accepted in `--log` without the `datachat::` prefix.
const EXTERNAL_TARGETS: &[&str] = &["reqwest", "hyper", "rusqlite"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How chatty the CLI is by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings, e.g. a transcript that could not be persisted.
    #[default]
    Normal,
    /// Turn and workspace lifecycle.
    Verbose,
    /// Everything datachat logs except per-read cache chatter.
    Debug,
    /// Everything, including HTTP client internals.
    Trace,
}

impl Verbosity {
    /// The strongest flag wins; `quiet` overrides all of them.
    pub fn from_flags(verbose: bool, debug: bool, trace: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if trace {
            Verbosity::Trace
        } else if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn baseline(self) -> &'static [&'static str] {
        match self {
            Verbosity::Quiet => &["datachat=error"],
            Verbosity::Normal => &["datachat=warn"],
            Verbosity::Verbose => &[
                "datachat=warn",
                "datachat::startup=info",
                "datachat::workspace=info",
                "datachat::turn=info",
            ],
            Verbosity::Debug => &["datachat=debug", "datachat::cache=info", "reqwest=info"],
            Verbosity::Trace => &["datachat=trace", "reqwest=trace", "hyper=debug"],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub verbosity: Verbosity,
    /// `(target, level)` pairs in command-line order; later ones win.
    pub overrides: Vec<(String, LevelFilter)>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Build from CLI values. Each `--log` value may hold several
    /// comma-separated `target=level` pairs.
    pub fn new(verbosity: Verbosity, log_args: &[String], format: LogFormat) -> Result<Self> {
        let overrides = log_args
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter(|part| !part.trim().is_empty())
            .map(parse_override)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            verbosity,
            overrides,
            format,
        })
    }

    /// Filter directives for this config, ignoring `RUST_LOG`.
    pub fn directives(&self) -> Vec<String> {
        let mut directives: Vec<String> = self
            .verbosity
            .baseline()
            .iter()
            .map(|d| d.to_string())
            .collect();
        directives.extend(
            self.overrides
                .iter()
                .map(|(target, level)| format!("{}={}", target, level)),
        );
        directives
    }

    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        let filter = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());
        filter
            .parse(self.directives().join(","))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Parse `target=level`, prefixing bare datachat areas ("turn" -> "datachat::turn").
fn parse_override(part: &str) -> Result<(String, LevelFilter)> {
    let (target, level) = part
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid --log value '{}': expected TARGET=LEVEL", part.trim()))?;
    let target = target.trim();
    let level: LevelFilter = level
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid log level '{}' for target '{}'", level.trim(), target))?;

    let target = if target.starts_with("datachat") || EXTERNAL_TARGETS.contains(&target) {
        target.to_string()
    } else {
        format!("datachat::{}", target)
    };
    Ok((target, level))
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .without_time(),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .init(),
    }
}
