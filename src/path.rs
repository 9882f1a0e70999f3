//! Path manipulation utilities for extlibs

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` that would climb above the start of a relative path is kept, so
/// `../x` stays `../x`. On an absolute path it stops at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether a relative path normalizes to nothing, i.e. names its own base
/// directory (`""`, `.`, `./`, `x/..`).
pub fn is_base_itself(path: &Path) -> bool {
    !path.is_absolute() && normalize(path).as_os_str().is_empty()
}

/// Whether a path leaves the directory it is relative to: it is absolute, or
/// it still starts with `..` once normalized.
pub fn escapes_base(path: &Path) -> bool {
    path.has_root()
        || matches!(
            normalize(path).components().next(),
            Some(Component::ParentDir) | Some(Component::Prefix(_))
        )
}
