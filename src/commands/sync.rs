//! Sync command implementation
//!
//! Loads the library configuration, checks the cache root, and runs the
//! orchestrator over every declared library. Configuration and cache-root
//! problems abort before any library is touched; per-library failures are
//! reported by the orchestrator and turn into a non-zero exit at the end.

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use extlibs::cache::CacheStore;
use extlibs::config;
use extlibs::defaults::{default_lib_root, EXTROOT_ENV};
use extlibs::fetch::Fetcher;
use extlibs::orchestrator::{Orchestrator, RunOptions};
use extlibs::output::{self, Verbosity};

/// Arguments for a synchronization run
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Library configuration file (INI)
    #[arg(value_name = "CONFIGFILE")]
    pub configfile: PathBuf,

    /// Root directory of the shared library cache
    #[arg(short = 'e', long, value_name = "EXTROOT", env = EXTROOT_ENV)]
    pub extroot: Option<PathBuf>,

    /// Directory that link destinations are relative to
    /// (defaults to the directory containing CONFIGFILE)
    #[arg(short = 'l', long, value_name = "LIBROOT")]
    pub libroot: Option<PathBuf>,

    /// Remove cached libraries and fetch them again
    #[arg(short, long)]
    pub force: bool,

    /// Do not fetch or update libraries; use the cache as it is
    #[arg(long)]
    pub no_update: bool,

    /// Do not create links
    #[arg(long)]
    pub no_link: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Only print errors (implies --quiet)
    #[arg(short = 'Q', long)]
    pub very_quiet: bool,
}

impl SyncArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.very_quiet)
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            force: self.force,
            no_update: self.no_update,
            no_link: self.no_link,
        }
    }
}

/// Execute a synchronization run
pub fn execute(args: SyncArgs) -> Result<()> {
    let Some(extroot) = args.extroot.clone() else {
        anyhow::bail!(
            "No library cache root given.\n\
             Pass -e/--extroot or add `export {}=/path/to/cache` to your shell profile",
            EXTROOT_ENV
        );
    };
    if !extroot.is_dir() {
        anyhow::bail!(
            "Library cache root {} does not exist or is not a directory",
            extroot.display()
        );
    }

    let declarations = config::from_file(&args.configfile)?;

    let lib_root = match &args.libroot {
        Some(path) => path.clone(),
        None => default_lib_root(&args.configfile).with_context(|| {
            format!(
                "Cannot determine the directory of {}",
                args.configfile.display()
            )
        })?,
    };

    info!(
        "Synchronizing {} libraries from {}",
        declarations.len(),
        args.configfile.display()
    );

    let cache = CacheStore::new(extroot);
    let fetcher = Fetcher::new(cache.clone(), output::show_progress(args.verbosity()));
    let orchestrator = Orchestrator::new(cache, fetcher, lib_root);
    let report = orchestrator.run(&declarations, &args.run_options());

    if !report.is_success() {
        let names: Vec<_> = report.failures.iter().map(|(name, _)| name.as_str()).collect();
        anyhow::bail!("Failed to synchronize: {}", names.join(", "));
    }

    info!("Done");
    Ok(())
}
