//! Planning and creating the links from cache slots into the project.
//!
//! Links are absolute symbolic links. Applying a plan twice leaves the
//! filesystem in the same state as applying it once: whatever already sits at
//! a destination (an older link, a file, a directory) is replaced.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::cache::CacheSlot;
use crate::config::LibraryDeclaration;
use crate::error::{Error, Result};
use crate::path::normalize;

/// A concrete link to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// Absolute path inside the cache slot.
    pub source: PathBuf,
    /// Path inside the project that will become the link.
    pub destination: PathBuf,
    /// Link root `destination` was planned against. Never replaced.
    pub root: PathBuf,
}

/// Compute the links for one library, in declaration order.
///
/// Relative `lib_root`s are made absolute against the current directory so
/// that the created links never depend on where they are resolved from.
pub fn plan(
    declaration: &LibraryDeclaration,
    slot: &CacheSlot,
    lib_root: &Path,
) -> Vec<LinkSpec> {
    let slot_root = absolute(&slot.path);
    let lib_root = absolute(lib_root);

    declaration
        .links
        .iter()
        .map(|mapping| LinkSpec {
            source: join_clean(&slot_root, &mapping.from),
            destination: join_clean(&lib_root, &mapping.to),
            root: lib_root.clone(),
        })
        .collect()
}

/// Create every link of a plan, stopping at the first failure.
pub fn apply(specs: &[LinkSpec]) -> Result<()> {
    for spec in specs {
        apply_one(spec)?;
    }
    Ok(())
}

/// Create one link, replacing whatever is at its destination.
///
/// Destinations that are the link root, or contain it or the link source,
/// are refused before anything is removed.
pub fn apply_one(spec: &LinkSpec) -> Result<()> {
    let source_meta = match fs::metadata(&spec.source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::LinkTargetMissing {
                source_path: spec.source.clone(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    check_destination(spec)?;

    if let Some(parent) = spec.destination.parent() {
        fs::create_dir_all(parent)?;
    }
    remove_existing(&spec.destination)?;

    debug!(
        "Linking {} -> {}",
        spec.destination.display(),
        spec.source.display()
    );
    create_symlink(&spec.source, &spec.destination, source_meta.is_dir())?;
    Ok(())
}

fn check_destination(spec: &LinkSpec) -> Result<()> {
    let destination = normalize(&spec.destination);
    let reason = if normalize(&spec.root).starts_with(&destination) {
        "it would replace the link root"
    } else if normalize(&spec.source).starts_with(&destination) {
        "it would replace the link source"
    } else {
        return Ok(());
    };
    Err(Error::UnsafeLinkDestination {
        destination: spec.destination.clone(),
        reason: reason.to_string(),
    })
}

/// Remove a link, file, or directory tree. Symlinks are never followed.
fn remove_existing(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if meta.file_type().is_symlink() {
        remove_symlink(path)
    } else if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn create_symlink(source: &Path, destination: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(windows)]
fn create_symlink(source: &Path, destination: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(source, destination)
    } else {
        std::os::windows::fs::symlink_file(source, destination)
    }
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    // Directory symlinks on Windows are removed like directories
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Join `relative` onto `base`, dropping `.` components. An empty or `.`
/// path yields `base` itself.
fn join_clean(base: &Path, relative: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            other => joined.push(other.as_os_str()),
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::config::{LinkMapping, VersionSpec};
    use tempfile::TempDir;

    fn declaration(links: &[(&str, &str)]) -> LibraryDeclaration {
        LibraryDeclaration {
            name: "Dojo".to_string(),
            source_kind: "Github".to_string(),
            url: "dojo/dojo".to_string(),
            version: VersionSpec::default(),
            links: links
                .iter()
                .map(|(from, to)| LinkMapping {
                    from: PathBuf::from(from),
                    to: PathBuf::from(to),
                })
                .collect(),
        }
    }

    struct Layout {
        temp: TempDir,
        slot: CacheSlot,
        lib_root: PathBuf,
    }

    fn layout() -> Layout {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("cache"));
        let slot = store.slot_for("Dojo").unwrap();
        fs::create_dir_all(slot.path.join("dojo")).unwrap();
        fs::write(slot.path.join("dojo/dojo.js"), "dojo").unwrap();
        fs::write(slot.path.join("LICENSE"), "bsd").unwrap();
        let lib_root = temp.path().join("project/lib");
        Layout {
            temp,
            slot,
            lib_root,
        }
    }

    #[test]
    fn test_plan_joins_paths_in_order() {
        let l = layout();
        let decl = declaration(&[(".", "../public/vendor/dojo"), ("dojo", "dojo-core")]);

        let specs = plan(&decl, &l.slot, &l.lib_root);

        assert_eq!(
            specs,
            vec![
                LinkSpec {
                    source: l.slot.path.clone(),
                    destination: l.lib_root.join("../public/vendor/dojo"),
                    root: l.lib_root.clone(),
                },
                LinkSpec {
                    source: l.slot.path.join("dojo"),
                    destination: l.lib_root.join("dojo-core"),
                    root: l.lib_root.clone(),
                },
            ]
        );
    }

    #[test]
    fn test_plan_empty_from_is_slot_root() {
        let l = layout();
        let specs = plan(&declaration(&[("", "dojo")]), &l.slot, &l.lib_root);
        assert_eq!(specs[0].source, l.slot.path);
    }

    #[test]
    fn test_plan_makes_relative_lib_root_absolute() {
        let l = layout();
        let specs = plan(&declaration(&[(".", "dojo")]), &l.slot, Path::new("lib"));
        assert!(specs[0].destination.is_absolute());
        assert!(specs[0].destination.ends_with("lib/dojo"));
    }

    #[test]
    fn test_apply_creates_parents_and_absolute_links() {
        let l = layout();
        let specs = plan(
            &declaration(&[(".", "../public/vendor/dojo"), ("LICENSE", "LICENSE.dojo")]),
            &l.slot,
            &l.lib_root,
        );

        apply(&specs).unwrap();

        let dir_link = l.temp.path().join("project/public/vendor/dojo");
        assert!(fs::symlink_metadata(&dir_link)
            .unwrap()
            .file_type()
            .is_symlink());
        let target = fs::read_link(&dir_link).unwrap();
        assert!(target.is_absolute());
        assert_eq!(target, l.slot.path);
        assert_eq!(
            fs::read_to_string(dir_link.join("dojo/dojo.js")).unwrap(),
            "dojo"
        );
        assert_eq!(
            fs::read_to_string(l.lib_root.join("LICENSE.dojo")).unwrap(),
            "bsd"
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let l = layout();
        let specs = plan(&declaration(&[("dojo", "dojo")]), &l.slot, &l.lib_root);

        apply(&specs).unwrap();
        let first = fs::read_link(l.lib_root.join("dojo")).unwrap();
        apply(&specs).unwrap();
        let second = fs::read_link(l.lib_root.join("dojo")).unwrap();

        assert_eq!(first, second);
        let entries: Vec<_> = fs::read_dir(&l.lib_root).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_apply_replaces_existing_destination() {
        let l = layout();
        let destination = l.lib_root.join("dojo");
        fs::create_dir_all(destination.join("old")).unwrap();
        fs::write(destination.join("old/file.js"), "old").unwrap();

        let specs = plan(&declaration(&[("dojo", "dojo")]), &l.slot, &l.lib_root);
        apply(&specs).unwrap();

        assert!(fs::symlink_metadata(&destination)
            .unwrap()
            .file_type()
            .is_symlink());
        assert!(destination.join("dojo.js").exists());
        // The replaced directory was removed, not followed into the slot
        assert!(!l.slot.path.join("dojo/old").exists());
    }

    #[test]
    fn test_apply_replaces_dangling_link() {
        let l = layout();
        fs::create_dir_all(&l.lib_root).unwrap();
        let destination = l.lib_root.join("dojo");
        create_symlink(&l.temp.path().join("gone"), &destination, true).unwrap();

        let specs = plan(&declaration(&[("dojo", "dojo")]), &l.slot, &l.lib_root);
        apply(&specs).unwrap();

        assert_eq!(fs::read_link(&destination).unwrap(), l.slot.path.join("dojo"));
    }

    #[test]
    fn test_apply_missing_source() {
        let l = layout();
        let specs = plan(&declaration(&[("nope", "nope")]), &l.slot, &l.lib_root);

        let err = apply(&specs).unwrap_err();

        let Error::LinkTargetMissing { source_path } = err else {
            panic!("Expected LinkTargetMissing, got {:?}", err);
        };
        assert!(source_path.ends_with("nope"));
        assert!(fs::symlink_metadata(l.lib_root.join("nope")).is_err());
    }

    fn project_with_config(l: &Layout) {
        fs::create_dir_all(&l.lib_root).unwrap();
        fs::write(l.lib_root.join("libraries.ini"), "[Dojo]").unwrap();
        fs::write(l.lib_root.join("main.php"), "<?php").unwrap();
    }

    #[test]
    fn test_apply_refuses_to_replace_link_root() {
        let l = layout();
        project_with_config(&l);

        for to in [".", "./", "x/..", "../lib"] {
            let specs = plan(&declaration(&[(".", to)]), &l.slot, &l.lib_root);
            let err = apply(&specs).unwrap_err();
            assert!(
                matches!(err, Error::UnsafeLinkDestination { .. }),
                "linked over the root with {:?}",
                to
            );
        }

        assert!(!fs::symlink_metadata(&l.lib_root)
            .unwrap()
            .file_type()
            .is_symlink());
        assert!(l.lib_root.join("libraries.ini").exists());
        assert!(l.lib_root.join("main.php").exists());
    }

    #[test]
    fn test_apply_refuses_ancestor_of_link_root() {
        let l = layout();
        project_with_config(&l);

        let specs = plan(&declaration(&[(".", "..")]), &l.slot, &l.lib_root);
        let err = apply(&specs).unwrap_err();

        assert!(err.to_string().contains("link root"));
        assert!(l.lib_root.join("libraries.ini").exists());
    }

    #[test]
    fn test_apply_refuses_to_replace_link_source() {
        let l = layout();
        let cache_root = l.slot.path.parent().unwrap().to_path_buf();
        let spec = LinkSpec {
            source: l.slot.path.join("dojo"),
            destination: cache_root.clone(),
            root: l.lib_root.clone(),
        };

        let err = apply_one(&spec).unwrap_err();

        assert!(err.to_string().contains("link source"));
        assert!(l.slot.path.join("dojo/dojo.js").exists());
    }
}
