//! Shared test utilities for E2E tests.
//!
//! This module provides a fixture with a project directory, a library
//! configuration file and a cache root, plus helpers to pre-seed cache slots
//! so runs can be exercised without network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::DOJO);
//!     fixture.command().assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::git_available;
    pub use super::TestFixture;
}

/// Library configuration snippets.
#[allow(dead_code)]
pub mod configs {
    /// One GitHub library linked from its root.
    pub const DOJO: &str = r#"
[Dojo]
type = Github
url = dojo/dojo
tag = 1.7.1
link_from = .
link_to = ../public/static/vendor/dojo
"#;

    /// An unknown provider followed by a valid library.
    pub const UNKNOWN_THEN_VALID: &str = r#"
[Mystery]
type = Sourceforge
url = some/project
link_from = .
link_to = mystery

[Dojo]
type = Github
url = dojo/dojo
tag = 1.7.1
link_from = dojo
link_to = dojo
"#;

    /// Both tag and branch set.
    pub const AMBIGUOUS: &str = r#"
[Dojo]
type = Github
url = dojo/dojo
tag = 1.7.1
branch = master
link_from = .
link_to = dojo
"#;

    /// Several links from the same library.
    pub const NUMBERED_LINKS: &str = r#"
[Dojo]
type = Github
url = dojo/dojo
tag = 1.7.1
link_from = dojo
link_to = js/dojo
link_from.1 = dijit
link_to.1 = js/dijit
"#;

    /// Structurally broken: link_from without link_to.
    pub const UNPAIRED_LINK: &str = r#"
[Dojo]
type = Github
url = dojo/dojo
link_from = .
"#;
}

/// Whether a `git` binary can be run. Tests that need one return early
/// without it.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// A temporary workspace:
///
/// ```text
/// <tmp>/cache/                     cache root
/// <tmp>/project/lib/libraries.ini  configuration (lib root)
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty cache root and project directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("cache")
            .create_dir_all()
            .expect("Failed to create cache root");
        temp_dir
            .child("project/lib")
            .create_dir_all()
            .expect("Failed to create project");
        Self { temp_dir }
    }

    /// Write the library configuration file.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("project/lib/libraries.ini")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Pre-seed an archive slot with the given files.
    #[allow(dead_code)]
    pub fn with_cached_archive(self, name: &str, files: &[(&str, &str)]) -> Self {
        for (path, content) in files {
            self.temp_dir
                .child(format!("cache/{}/{}", name, path))
                .write_str(content)
                .expect("Failed to seed cache slot");
        }
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn cache_root(&self) -> PathBuf {
        self.path().join("cache")
    }

    pub fn lib_root(&self) -> PathBuf {
        self.path().join("project/lib")
    }

    pub fn config_path(&self) -> PathBuf {
        self.lib_root().join("libraries.ini")
    }

    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// A command with a clean environment, run from the fixture root.
    pub fn bare_command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("extlibs");
        cmd.current_dir(self.path())
            .env_remove("EXTLIBS_ROOT")
            .env_remove("RUST_LOG");
        cmd
    }

    /// A command with `EXTLIBS_ROOT` pointing at the fixture's cache root and
    /// the configuration file as argument.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = self.bare_command();
        cmd.env("EXTLIBS_ROOT", self.cache_root())
            .arg(self.config_path());
        cmd
    }
}
