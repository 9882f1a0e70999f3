//! # Shared Library Cache
//!
//! The cache root holds one directory (a *slot*) per library name. A slot is
//! either an extracted archive snapshot or a full repository clone, and it is
//! shared by every project that declares a library with the same name.
//!
//! Slot paths are derived from the library name alone, so the same library
//! lands in the same place on every run. Names must be a single plain path
//! component; anything that could escape the cache root is rejected rather
//! than rewritten, which keeps the mapping from names to slots collision-free.
//!
//! There is no locking. Two processes updating the same slot at the same time
//! is unsupported.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// What a slot holds on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// An extracted archive snapshot, refreshed only by replacement.
    Archive,
    /// A repository clone that can be updated in place.
    Clone,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Archive => write!(f, "archive"),
            SlotKind::Clone => write!(f, "clone"),
        }
    }
}

/// The cache location of one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    pub name: String,
    pub path: PathBuf,
}

impl CacheSlot {
    /// Whether anything has been materialized into this slot.
    pub fn present(&self) -> bool {
        self.path.is_dir()
    }

    /// Detect the slot's kind from its contents. `None` when absent.
    pub fn kind(&self) -> Option<SlotKind> {
        if !self.present() {
            return None;
        }
        // `.git` is a file rather than a directory in worktrees
        if self.path.join(".git").exists() {
            Some(SlotKind::Clone)
        } else {
            Some(SlotKind::Archive)
        }
    }
}

/// Manages slots under a cache root.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the slot for a library name. Performs no I/O.
    pub fn slot_for(&self, name: &str) -> Result<CacheSlot> {
        validate_name(name)?;
        Ok(CacheSlot {
            name: name.to_string(),
            path: self.root.join(name),
        })
    }

    pub fn exists(&self, slot: &CacheSlot) -> bool {
        slot.present()
    }

    pub fn kind_of(&self, slot: &CacheSlot) -> Option<SlotKind> {
        slot.kind()
    }

    /// Remove a slot and everything in it. Missing slots are not an error.
    pub fn invalidate(&self, slot: &CacheSlot) -> Result<()> {
        match fs::symlink_metadata(&slot.path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&slot.path)?,
            Ok(_) => fs::remove_file(&slot.path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Staging directory used while a slot is being populated.
    ///
    /// Lives next to the slot so the final rename stays on one filesystem.
    pub fn staging_path(&self, slot: &CacheSlot) -> PathBuf {
        self.root.join(format!(".{}.partial", slot.name))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidLibraryName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name.contains(['/', '\\', '\0']) {
        return invalid("name contains a path separator");
    }
    if name.starts_with('.') {
        // Also reserves the namespace used for staging directories
        return invalid("name starts with '.'");
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => invalid("name is not a plain directory name"),
    }
}
