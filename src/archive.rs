//! Archive download and extraction.
//!
//! Hosted providers serve snapshots as tarballs or zipballs that wrap the
//! project in a single top-level directory (`owner-repo-abc123/`). Extraction
//! drops that wrapper so the destination directory becomes the library root.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use tar::{Archive, EntryType};

use crate::error::{Error, Result};
use crate::provider::{ArchiveFormat, ArchiveUrl};

const USER_AGENT: &str = concat!("extlibs/", env!("CARGO_PKG_VERSION"));

/// Download `url` into `dest`, returning the number of bytes written.
pub fn download(url: &str, dest: &mut File, show_progress: bool) -> Result<u64> {
    debug!("Downloading {}", url);
    let download_error = |message: String| Error::Download {
        url: url.to_string(),
        message,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| download_error(e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .map_err(|e| download_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(download_error(format!("HTTP {}", response.status())));
    }

    let progress = if show_progress {
        let bar = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut reader = progress.wrap_read(response);
    let written = io::copy(&mut reader, dest).map_err(|e| download_error(e.to_string()))?;
    progress.finish_and_clear();

    Ok(written)
}

/// Extract an archive file into `dest`, stripping the wrapper directory.
pub fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let file = File::open(archive)?;
    let label = archive.display().to_string();
    let result = match format {
        ArchiveFormat::TarGz => extract_tar_gz(file, dest),
        ArchiveFormat::Zip => extract_zip(file, dest),
    };
    result.map_err(|message| Error::Extract {
        archive: label,
        message,
    })
}

/// Unpacks every entry with `unpack_in` into a scratch directory next to
/// `dest`, so nothing is ever written through a link that leaves it, then
/// moves the wrapper's contents into `dest`.
fn extract_tar_gz(file: File, dest: &Path) -> std::result::Result<(), String> {
    let scratch_parent = dest.parent().unwrap_or(dest);
    let scratch = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(scratch_parent)
        .map_err(|e| format!("Failed to create extraction directory: {}", e))?;

    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| format!("Failed to read tar: {}", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| format!("Failed to read tar entry: {}", e))?;
        let path = entry
            .path()
            .map_err(|e| format!("Invalid path in tar: {}", e))?
            .into_owned();

        match entry.header().entry_type() {
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            EntryType::Symlink | EntryType::Link => {
                let target = entry
                    .link_name()
                    .map_err(|e| format!("Invalid link in tar: {}", e))?
                    .map(|t| t.into_owned());
                if !link_stays_inside(&path, target.as_deref(), entry.header().entry_type()) {
                    warn!("Skipping link {} that points outside the archive", path.display());
                    continue;
                }
            }
            _ => {}
        }

        if strip_wrapper(&path).is_none() {
            continue;
        }
        entry
            .unpack_in(scratch.path())
            .map_err(|e| format!("Failed to extract {}: {}", path.display(), e))?;
    }

    move_wrapper_contents(scratch.path(), dest)
}

/// Whether a link entry at `path` resolves inside the wrapper directory.
/// Symlink targets are relative to the link; hard link targets are archive
/// paths.
fn link_stays_inside(path: &Path, target: Option<&Path>, kind: EntryType) -> bool {
    let Some(target) = target else {
        return false;
    };
    if kind == EntryType::Link {
        return strip_wrapper(target).is_some();
    }
    let Some(relative) = strip_wrapper(path) else {
        return false;
    };
    let base = relative.parent().unwrap_or(Path::new(""));
    !crate::path::escapes_base(&base.join(target))
}

/// Move the children of every top-level directory of `scratch` into `dest`.
/// Top-level files are dropped, like the wrapper itself.
fn move_wrapper_contents(scratch: &Path, dest: &Path) -> std::result::Result<(), String> {
    let read = |dir: &Path| fs::read_dir(dir).map_err(|e| e.to_string());
    for wrapper in read(scratch)? {
        let wrapper = wrapper.map_err(|e| e.to_string())?;
        if !wrapper.file_type().map_err(|e| e.to_string())?.is_dir() {
            continue;
        }
        for child in read(&wrapper.path())? {
            let child = child.map_err(|e| e.to_string())?;
            let target = dest.join(child.file_name());
            fs::rename(child.path(), &target)
                .map_err(|e| format!("Failed to move {}: {}", target.display(), e))?;
        }
    }
    Ok(())
}

fn extract_zip(file: File, dest: &Path) -> std::result::Result<(), String> {
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("Failed to open zip: {}", e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("Failed to read zip entry: {}", e))?;
        let Some(path) = entry.enclosed_name() else {
            continue;
        };
        let Some(relative) = strip_wrapper(&path) else {
            continue;
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| e.to_string())?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let mut out = File::create(&target).map_err(|e| e.to_string())?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| format!("Failed to extract {}: {}", relative.display(), e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// Drop the first path component. `None` for the wrapper itself, for
/// top-level entries, and for anything that is not a plain relative path.
fn strip_wrapper(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(_)) => {}
        _ => return None,
    }
    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Download `archive` to a temporary file under `temp_dir` and extract it
/// into `dest`. The temporary file is removed on return.
pub fn fetch_into(
    archive: &ArchiveUrl,
    temp_dir: &Path,
    dest: &Path,
    show_progress: bool,
) -> Result<()> {
    fs::create_dir_all(temp_dir)?;
    let mut download_file = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(temp_dir)?;

    download(&archive.url, download_file.as_file_mut(), show_progress)?;
    extract(download_file.path(), archive.format, dest)
}
