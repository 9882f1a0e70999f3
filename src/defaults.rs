//! Default values for extlibs configuration.
//!
//! This module provides centralized default values used by the CLI, so the
//! environment variable name and the default link root are defined once.

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable holding the shared cache root.
pub const EXTROOT_ENV: &str = "EXTLIBS_ROOT";

/// Returns the default link root: the absolute directory that contains the
/// configuration file.
///
/// Relative configuration paths are resolved against the current directory.
pub fn default_lib_root(config_path: &Path) -> io::Result<PathBuf> {
    let config_path = std::path::absolute(config_path)?;
    Ok(config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(config_path))
}
