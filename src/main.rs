//! # extlibs CLI
//!
//! This is the binary entry point for the `extlibs` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the synchronization and translating failures into an exit
//!   status.
//!
//! The core logic lives in the `lib.rs` library crate, so the binary stays a
//! thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
