//! # Error Handling
//!
//! This module defines the centralized error type for `extlibs`. It uses the
//! `thiserror` library to create a single `Error` enum that covers every
//! failure the library can report, each variant carrying enough context
//! (library name, URL, path, command) to diagnose a problem without
//! re-running at a higher verbosity.
//!
//! Errors fall into a few families:
//!
//! - **Configuration** (`ConfigParse`): the library file is malformed. These
//!   abort a run before any library is processed.
//! - **Per-library declaration problems** (`UnknownProvider`,
//!   `AmbiguousVersion`, `InvalidLibraryName`): fail one library only.
//! - **Fetch failures** (`Download`, `Extract`, `GitClone`, `GitCommand`):
//!   network, extraction, or git problems while materializing a cache slot.
//! - **Link failures** (`LinkTargetMissing`, `NotCached`,
//!   `UnsafeLinkDestination`): the slot does not contain what the declaration
//!   wants to expose, or the link would replace something it must not.
//! - **Wrapped library errors** (`Io`, `UrlParse`, `Regex`).
//!
//! The `Result` alias is used throughout the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for extlibs operations
#[derive(Error, Debug)]
pub enum Error {
    /// The library configuration file could not be parsed.
    ///
    /// Includes the specific problem and optionally a hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The `type` of a library does not name a known provider.
    #[error("Unknown library type '{kind}'")]
    UnknownProvider { kind: String },

    /// Both `tag` and `branch` were given for the same library.
    #[error("Ambiguous version: both tag '{tag}' and branch '{branch}' are set")]
    AmbiguousVersion { tag: String, branch: String },

    /// A library name cannot be used as a cache slot directory.
    #[error("Invalid library name '{name}': {reason}")]
    InvalidLibraryName { name: String, reason: String },

    /// Updating was disabled and the library has never been fetched.
    #[error("Library is not cached at {} and updating is disabled", path.display())]
    NotCached { path: PathBuf },

    /// An archive could not be downloaded.
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    /// A downloaded archive could not be extracted.
    #[error("Extraction failed for {archive}: {message}")]
    Extract { archive: String, message: String },

    /// A repository could not be cloned.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A git command run inside an existing clone failed.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A `link_from` path does not exist inside the cache slot.
    #[error("Link source does not exist: {}", source_path.display())]
    LinkTargetMissing { source_path: PathBuf },

    /// Creating the link would delete the link root or the link source.
    #[error("Refusing to link at {}: {reason}", destination.display())]
    UnsafeLinkDestination { destination: PathBuf, reason: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Whether this error came from fetching or extracting a library.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::Download { .. }
                | Error::Extract { .. }
                | Error::GitClone { .. }
                | Error::GitCommand { .. }
        )
    }

    /// Shorthand for a `ConfigParse` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
