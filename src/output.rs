//! # Output Configuration
//!
//! All diagnostic output goes through the `log` facade to stderr, backed by
//! `env_logger`. The `-q`/`-Q` flags pick the log level:
//!
//! | Flags      | Level   | Shows                                  |
//! |------------|---------|----------------------------------------|
//! | (none)     | `info`  | per-library progress, warnings, errors |
//! | `-q`       | `warn`  | warnings and errors                    |
//! | `-Q`       | `error` | errors only                            |
//!
//! `RUST_LOG` is honored on top of that, so `RUST_LOG=debug` shows the
//! individual git and download steps.

use std::env;
use std::io::Write;

use log::{Level, LevelFilter, SetLoggerError};

/// How chatty a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    VeryQuiet,
    Quiet,
    Normal,
}

impl Verbosity {
    /// `very_quiet` implies `quiet`.
    pub fn from_flags(quiet: bool, very_quiet: bool) -> Self {
        if very_quiet {
            Verbosity::VeryQuiet
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::VeryQuiet => LevelFilter::Error,
        }
    }
}

/// Install the global logger. Fails if a logger is already installed.
pub fn init_logging(verbosity: Verbosity) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity.level_filter())
        .target(env_logger::Target::Stderr)
        .format(|buf, record| match record.level() {
            Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level.as_str().to_lowercase(), record.args()),
        });

    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.try_init()
}

/// Whether download progress bars should be drawn.
///
/// Only at normal verbosity, and only when stderr is an interactive terminal.
pub fn show_progress(verbosity: Verbosity) -> bool {
    verbosity == Verbosity::Normal && console::Term::stderr().features().is_attended()
}
