//! # Run Orchestration
//!
//! Drives one synchronization run: for every declared library, in file
//! order, resolve its fetch reference, derive its cache slot, materialize the
//! slot, then create its links.
//!
//! A failing library never stops the run. Its error is logged with the
//! library name and collected in the [`RunReport`], and processing moves on
//! to the next declaration.

use std::path::PathBuf;

use log::{error, info};

use crate::cache::CacheStore;
use crate::config::LibraryDeclaration;
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, Fetcher, MaterializeResult};
use crate::link;
use crate::provider;

/// Behavior switches for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Refetch every library from scratch.
    pub force: bool,
    /// Use cached slots as they are; never touch the network.
    pub no_update: bool,
    /// Skip link creation.
    pub no_link: bool,
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Libraries that were fully processed.
    pub succeeded: Vec<String>,
    /// Libraries that failed, with the error that stopped them.
    pub failures: Vec<(String, Error)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Orchestrator {
    cache: CacheStore,
    fetcher: Fetcher,
    lib_root: PathBuf,
}

impl Orchestrator {
    pub fn new(cache: CacheStore, fetcher: Fetcher, lib_root: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            fetcher,
            lib_root: lib_root.into(),
        }
    }

    /// Process every declaration and report which ones failed.
    pub fn run(&self, declarations: &[LibraryDeclaration], options: &RunOptions) -> RunReport {
        let mut report = RunReport::default();

        for declaration in declarations {
            match self.process(declaration, options) {
                Ok(()) => report.succeeded.push(declaration.name.clone()),
                Err(e) => {
                    error!("[{}] {}", declaration.name, e);
                    report.failures.push((declaration.name.clone(), e));
                }
            }
        }

        if !report.is_success() {
            error!(
                "{} of {} libraries failed",
                report.failures.len(),
                declarations.len()
            );
        }
        report
    }

    fn process(&self, declaration: &LibraryDeclaration, options: &RunOptions) -> Result<()> {
        let reference = provider::resolve(
            &declaration.source_kind,
            &declaration.url,
            &declaration.version,
        )?;
        let slot = self.cache.slot_for(&declaration.name)?;

        if options.no_update {
            if !self.cache.exists(&slot) {
                return Err(Error::NotCached { path: slot.path });
            }
            info!("[{}] Using cached {}", declaration.name, slot.path.display());
        } else {
            info!("[{}] {}", declaration.name, reference.describe());
            let fetch_options = FetchOptions {
                force: options.force,
                no_update: false,
            };
            let result = self.fetcher.materialize(&reference, &slot, &fetch_options)?;
            match result {
                MaterializeResult::Cached => info!("[{}] Already up to date", declaration.name),
                other => info!(
                    "[{}] {} into {}",
                    declaration.name,
                    other,
                    slot.path.display()
                ),
            }
        }

        if options.no_link {
            return Ok(());
        }

        let specs = link::plan(declaration, &slot, &self.lib_root);
        for spec in &specs {
            info!(
                "[{}] Linking {} -> {}",
                declaration.name,
                spec.destination.display(),
                spec.source.display()
            );
            link::apply_one(spec)?;
        }
        Ok(())
    }
}
