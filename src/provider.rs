//! # Provider Resolution
//!
//! Maps a library's `type`, `url` and version keys to something that can be
//! fetched: either an archive URL on a hosted-code service or a repository
//! to clone.
//!
//! Providers are a static table of URL templates. Each template may use the
//! `{slice}` placeholder (the library's `url` key, e.g. `dojo/dojo`) and the
//! `{ref}` placeholder (the tag or branch). Adding a provider is adding a
//! [`Provider`] entry to [`PROVIDERS`].

use url::Url;

use crate::cache::SlotKind;
use crate::config::{VersionSelector, VersionSpec};
use crate::error::{Error, Result};

/// The `type` value that selects a plain repository clone.
pub const REPO_KIND: &str = "repo";

/// Archive container formats a provider can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball.
    TarGz,
    Zip,
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveFormat::TarGz => write!(f, "tarball"),
            ArchiveFormat::Zip => write!(f, "zipball"),
        }
    }
}

/// A downloadable snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUrl {
    pub url: String,
    pub format: ArchiveFormat,
}

/// A resolved fetch target for one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReference {
    /// A point-in-time snapshot. `fallback` is tried when `primary` cannot
    /// be downloaded.
    Archive {
        primary: ArchiveUrl,
        fallback: Option<ArchiveUrl>,
    },
    /// A full repository, cloned recursively and updatable in place.
    Clone {
        url: String,
        selector: VersionSelector,
    },
}

impl FetchReference {
    /// The kind of cache slot this reference materializes into.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            FetchReference::Archive { .. } => SlotKind::Archive,
            FetchReference::Clone { .. } => SlotKind::Clone,
        }
    }

    /// Short human-readable description for log output.
    pub fn describe(&self) -> String {
        match self {
            FetchReference::Archive { primary, .. } => {
                format!("{} {}", primary.format, primary.url)
            }
            FetchReference::Clone { url, selector } => match selector.ref_name() {
                Some(name) => format!("repository {} ({})", url, name),
                None => format!("repository {}", url),
            },
        }
    }
}

/// URL templates for one hosted-code service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    /// Lowercase `type` value selecting this provider.
    pub tag: &'static str,
    /// Project URL template, using `{slice}`.
    pub base: &'static str,
    /// Tarball path appended to `base`, using `{ref}`.
    pub tarball: Option<&'static str>,
    /// Zipball path appended to `base`, using `{ref}`.
    pub zipball: Option<&'static str>,
    /// Ref used when the declaration names neither tag nor branch.
    pub default_ref: &'static str,
}

/// Registered hosted-code providers.
pub const PROVIDERS: &[Provider] = &[
    Provider {
        tag: "github",
        base: "https://github.com/{slice}",
        tarball: Some("/tarball/{ref}"),
        zipball: Some("/zipball/{ref}"),
        default_ref: "HEAD",
    },
    Provider {
        tag: "bitbucket",
        base: "https://bitbucket.org/{slice}",
        tarball: Some("/get/{ref}.tar.gz"),
        zipball: Some("/get/{ref}.zip"),
        default_ref: "HEAD",
    },
    Provider {
        tag: "gitlab",
        base: "https://gitlab.com/{slice}",
        tarball: Some("/-/archive/{ref}/archive.tar.gz"),
        zipball: Some("/-/archive/{ref}/archive.zip"),
        default_ref: "HEAD",
    },
    Provider {
        tag: "gitorious",
        base: "https://gitorious.org/{slice}",
        tarball: Some("/archive-tarball/{ref}"),
        zipball: None,
        default_ref: "master",
    },
];

/// Look up a provider by its `type` value, ignoring case.
pub fn lookup(kind: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.tag.eq_ignore_ascii_case(kind))
}

impl Provider {
    /// Build the archive URLs for a slice and ref, preferred format first.
    pub fn archive_urls(&self, slice: &str, ref_name: &str) -> Result<Vec<ArchiveUrl>> {
        let slice = slice.trim_matches('/');
        let base = self.base.replace("{slice}", slice);

        let mut urls = Vec::new();
        let formats = [
            (self.tarball, ArchiveFormat::TarGz),
            (self.zipball, ArchiveFormat::Zip),
        ];
        for (template, format) in formats {
            let Some(template) = template else {
                continue;
            };
            let raw = format!("{}{}", base, template.replace("{ref}", ref_name));
            let url = Url::parse(&raw)?;
            urls.push(ArchiveUrl {
                url: url.into(),
                format,
            });
        }
        Ok(urls)
    }
}

/// Resolve a declaration's source into a [`FetchReference`].
///
/// Fails with [`Error::AmbiguousVersion`] when both tag and branch are set
/// and with [`Error::UnknownProvider`] when `source_kind` is neither
/// [`REPO_KIND`] nor a registered provider.
pub fn resolve(
    source_kind: &str,
    url_or_slice: &str,
    version: &VersionSpec,
) -> Result<FetchReference> {
    let selector = version.selector()?;

    if source_kind.eq_ignore_ascii_case(REPO_KIND) {
        return Ok(FetchReference::Clone {
            url: url_or_slice.to_string(),
            selector,
        });
    }

    let provider = lookup(source_kind).ok_or_else(|| Error::UnknownProvider {
        kind: source_kind.to_string(),
    })?;
    let ref_name = selector.ref_name().unwrap_or(provider.default_ref);

    let mut urls = provider.archive_urls(url_or_slice, ref_name)?.into_iter();
    let primary = urls.next().ok_or_else(|| Error::UnknownProvider {
        kind: source_kind.to_string(),
    })?;

    Ok(FetchReference::Archive {
        primary,
        fallback: urls.next(),
    })
}
