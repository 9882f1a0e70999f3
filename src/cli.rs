//! CLI argument parsing and dispatch

use anyhow::Result;
use clap::Parser;

use crate::commands;
use extlibs::output;

/// Fetch external libraries into a shared cache and link them into a project
#[derive(Parser, Debug)]
#[command(name = "extlibs")]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    #[command(flatten)]
    sync: commands::sync::SyncArgs,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Only fails if a logger is already installed
        let _ = output::init_logging(self.sync.verbosity());

        commands::sync::execute(self.sync)
    }
}
