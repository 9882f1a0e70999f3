//! # Fetching Libraries into the Cache
//!
//! This module provides the `Fetcher`, which decides per library whether a
//! cache slot needs a fresh fetch, an in-place update, or nothing at all,
//! and then carries that out.
//!
//! ## Design
//!
//! The `Fetcher` is built around two traits that separate the caching state
//! machine from the concrete transport:
//!
//! - **`GitOperations`**: cloning a repository recursively and updating an
//!   existing clone.
//! - **`ArchiveOperations`**: downloading an archive and extracting it into a
//!   directory.
//!
//! In the application, `DefaultGitOperations` (the system `git` binary) and
//! `DefaultArchiveOperations` (HTTP download plus tar/zip extraction) are
//! used. Tests inject mock implementations that record calls, so the state
//! machine can be checked without network access.
//!
//! ## State machine
//!
//! Evaluated in order for each library:
//!
//! 1. Slot absent: fetch.
//! 2. Slot present and `force`: invalidate, then fetch.
//! 3. Slot present and `no_update`: nothing to do.
//! 4. Slot present but holding the other kind (archive vs. clone): treated
//!    like `force`.
//! 5. Slot present, archive reference: nothing to do. Snapshots only change
//!    through `force`.
//! 6. Slot present, clone reference: update in place, submodules included.
//!
//! A fresh fetch that fails leaves no slot behind. A failed update leaves the
//! existing slot where it is.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::cache::{CacheSlot, CacheStore};
use crate::config::VersionSelector;
use crate::error::{Error, Result};
use crate::provider::{ArchiveUrl, FetchReference};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Clone `url` with all submodules into `target_dir`, checking out the
    /// selected ref.
    fn clone_recursive(&self, url: &str, selector: &VersionSelector, target_dir: &Path)
        -> Result<()>;

    /// Update an existing clone to the latest state of the selected ref,
    /// submodules included.
    fn update(&self, repo_dir: &Path, selector: &VersionSelector) -> Result<()>;
}

/// Trait for archive operations - allows mocking in tests
pub trait ArchiveOperations: Send + Sync {
    /// Download `archive` and extract it into `dest`, without the archive's
    /// wrapper directory. Temporary files go under `temp_dir`.
    fn fetch_into(&self, archive: &ArchiveUrl, temp_dir: &Path, dest: &Path) -> Result<()>;
}

/// Uses the system `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_recursive(
        &self,
        url: &str,
        selector: &VersionSelector,
        target_dir: &Path,
    ) -> Result<()> {
        crate::git::clone_recursive(url, selector, target_dir)
    }

    fn update(&self, repo_dir: &Path, selector: &VersionSelector) -> Result<()> {
        crate::git::update_clone(repo_dir, selector)
    }
}

/// Downloads over HTTP(S) and extracts tarballs and zipballs.
pub struct DefaultArchiveOperations {
    show_progress: bool,
}

impl DefaultArchiveOperations {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl ArchiveOperations for DefaultArchiveOperations {
    fn fetch_into(&self, archive: &ArchiveUrl, temp_dir: &Path, dest: &Path) -> Result<()> {
        crate::archive::fetch_into(archive, temp_dir, dest, self.show_progress)
    }
}

/// Flags that change how an existing slot is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Replace existing slots unconditionally.
    pub force: bool,
    /// Leave existing slots untouched.
    pub no_update: bool,
}

/// What `materialize` did to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeResult {
    /// An archive was downloaded and extracted into a new slot.
    Downloaded,
    /// A repository was cloned into a new slot.
    Cloned,
    /// An existing clone was updated in place.
    Updated,
    /// The existing slot was used as is.
    Cached,
}

impl std::fmt::Display for MaterializeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MaterializeResult::Downloaded => "downloaded",
            MaterializeResult::Cloned => "cloned",
            MaterializeResult::Updated => "updated",
            MaterializeResult::Cached => "cached",
        };
        f.write_str(text)
    }
}

/// Materializes fetch references into cache slots.
pub struct Fetcher {
    cache: CacheStore,
    git_ops: Box<dyn GitOperations>,
    archive_ops: Box<dyn ArchiveOperations>,
}

impl Fetcher {
    /// Creates a `Fetcher` backed by the system `git` and HTTP downloads.
    pub fn new(cache: CacheStore, show_progress: bool) -> Self {
        Self {
            cache,
            git_ops: Box::new(DefaultGitOperations),
            archive_ops: Box::new(DefaultArchiveOperations::new(show_progress)),
        }
    }

    /// Creates a `Fetcher` with custom `GitOperations` and
    /// `ArchiveOperations` implementations.
    ///
    /// This is primarily used for testing to inject mock operations.
    #[cfg(test)]
    pub fn with_operations(
        cache: CacheStore,
        git_ops: Box<dyn GitOperations>,
        archive_ops: Box<dyn ArchiveOperations>,
    ) -> Self {
        Self {
            cache,
            git_ops,
            archive_ops,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Bring `slot` in line with `reference`.
    pub fn materialize(
        &self,
        reference: &FetchReference,
        slot: &CacheSlot,
        options: &FetchOptions,
    ) -> Result<MaterializeResult> {
        let Some(kind) = self.cache.kind_of(slot) else {
            return self.fetch_fresh(reference, slot);
        };

        if options.force {
            info!("Removing old version of {}", slot.path.display());
            self.cache.invalidate(slot)?;
            return self.fetch_fresh(reference, slot);
        }

        if options.no_update {
            debug!("{} already exists, not updating", slot.path.display());
            return Ok(MaterializeResult::Cached);
        }

        if kind != reference.slot_kind() {
            warn!(
                "{} holds an {} but the library is now fetched as an {}; replacing it",
                slot.path.display(),
                kind,
                reference.slot_kind()
            );
            self.cache.invalidate(slot)?;
            return self.fetch_fresh(reference, slot);
        }

        match reference {
            FetchReference::Archive { .. } => {
                debug!("{} already exists", slot.path.display());
                Ok(MaterializeResult::Cached)
            }
            FetchReference::Clone { url, selector } => {
                info!("Updating {} from {}", slot.name, url);
                self.git_ops.update(&slot.path, selector)?;
                Ok(MaterializeResult::Updated)
            }
        }
    }

    fn fetch_fresh(
        &self,
        reference: &FetchReference,
        slot: &CacheSlot,
    ) -> Result<MaterializeResult> {
        fs::create_dir_all(self.cache.root())?;
        // A stray file where the slot should be
        self.cache.invalidate(slot)?;

        match reference {
            FetchReference::Archive { primary, fallback } => {
                let candidates = std::iter::once(primary).chain(fallback.as_ref());
                self.fetch_archive(candidates, slot)?;
                Ok(MaterializeResult::Downloaded)
            }
            FetchReference::Clone { url, selector } => {
                info!("Cloning {} into {}", url, slot.path.display());
                if let Err(e) = self.git_ops.clone_recursive(url, selector, &slot.path) {
                    let _ = self.cache.invalidate(slot);
                    return Err(e);
                }
                Ok(MaterializeResult::Cloned)
            }
        }
    }

    /// Try each archive URL in turn until one downloads. Extraction goes to a
    /// staging directory that is renamed into place only on success.
    fn fetch_archive<'a>(
        &self,
        candidates: impl Iterator<Item = &'a ArchiveUrl>,
        slot: &CacheSlot,
    ) -> Result<()> {
        let staging = self.cache.staging_path(slot);
        let mut candidates = candidates.peekable();

        while let Some(archive) = candidates.next() {
            remove_dir_if_exists(&staging)?;
            info!("Fetching {} {} for {}", archive.format, archive.url, slot.name);

            match self
                .archive_ops
                .fetch_into(archive, self.cache.root(), &staging)
            {
                Ok(()) => {
                    if let Err(e) = fs::rename(&staging, &slot.path) {
                        let _ = fs::remove_dir_all(&staging);
                        return Err(e.into());
                    }
                    return Ok(());
                }
                Err(e) => {
                    let _ = fs::remove_dir_all(&staging);
                    let retry = matches!(e, Error::Download { .. }) && candidates.peek().is_some();
                    if !retry {
                        return Err(e);
                    }
                    warn!("{}; trying the next archive format", e);
                }
            }
        }

        Err(Error::Download {
            url: slot.name.clone(),
            message: "no archive URL available".to_string(),
        })
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}
