//! # extlibs
//!
//! Synchronizes external source-code libraries into a project tree without
//! embedding their repositories. A configuration file declares each library
//! with a provider, a version selector, and one or more link mappings. Every
//! library is materialized once into a shared cache root and then exposed in
//! the project through symbolic links.
//!
//! ## Quick Example
//!
//! ```
//! use extlibs::config;
//! use extlibs::provider::{self, FetchReference};
//!
//! let libraries = config::parse(
//!     "[Dojo]\ntype = Github\nurl = dojo/dojo\ntag = 1.7.1\nlink_from = .\nlink_to = dojo\n",
//! )
//! .unwrap();
//!
//! let dojo = &libraries[0];
//! let reference = provider::resolve(&dojo.source_kind, &dojo.url, &dojo.version).unwrap();
//! assert!(matches!(reference, FetchReference::Archive { .. }));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: parses the INI library file into
//!   declarations.
//! - **Providers (`provider`)**: turns a declaration into an archive URL on a
//!   hosted-code service or a repository to clone.
//! - **Cache (`cache`)**: one slot directory per library under the cache
//!   root.
//! - **Fetching (`fetch`, `git`, `archive`)**: decides between a fresh fetch,
//!   an update, or nothing, and carries it out.
//! - **Links (`link`)**: plans and creates symlinks from slots into the
//!   project.
//! - **Orchestration (`orchestrator`)**: runs all of the above per library
//!   and collects failures.

pub mod archive;
pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod git;
pub mod link;
pub mod orchestrator;
pub mod output;
pub mod path;
pub mod provider;

#[cfg(test)]
mod cache_proptest;
