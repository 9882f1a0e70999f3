//! # Library Configuration Parsing
//!
//! This module turns a library configuration file into a list of
//! [`LibraryDeclaration`]s. The file is a sectioned key/value (INI) document
//! where every section names one external library:
//!
//! ```ini
//! [Dojo]
//! type = Github
//! url = dojo/dojo
//! tag = 1.7.1
//! link_from = .
//! link_to = ../public/static/vendor/dojo
//! ```
//!
//! ## Keys
//!
//! - `type`: a provider tag (`Github`, `Bitbucket`, ...) or `Repo` for a plain
//!   repository clone. Matched case-insensitively later, by the resolver.
//! - `url`: a path slice for providers (`dojo/dojo`) or a full clone URL.
//! - `tag` / `branch`: the version selector. Both are kept as written; the
//!   resolver rejects declarations that set both.
//! - `link_from` / `link_to`: one link mapping. Numbered variants
//!   (`link_from.1`, `link_to.1`, ...) add more mappings under the same
//!   library. Mappings keep the order in which their `link_from` keys appear.
//!
//! Unknown keys are ignored. Structural problems (missing `type` or `url`,
//! unpaired link keys, duplicate sections) are reported as
//! [`Error::ConfigParse`] and abort the whole run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption, Properties};
use regex::Regex;

use crate::error::{Error, Result};

/// One `(link_from, link_to)` pair of a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMapping {
    /// Path relative to the root of the library's cache slot.
    pub from: PathBuf,
    /// Path relative to the project's link root.
    pub to: PathBuf,
}

/// The version keys of a declaration, exactly as they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSpec {
    pub tag: Option<String>,
    pub branch: Option<String>,
}

/// A validated version selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Tag(String),
    Branch(String),
    /// Neither tag nor branch given; the upstream default branch is implied.
    Default,
}

impl VersionSpec {
    /// Collapse the raw keys into a selector.
    ///
    /// Fails with [`Error::AmbiguousVersion`] when both keys are set.
    pub fn selector(&self) -> Result<VersionSelector> {
        match (&self.tag, &self.branch) {
            (Some(tag), Some(branch)) => Err(Error::AmbiguousVersion {
                tag: tag.clone(),
                branch: branch.clone(),
            }),
            (Some(tag), None) => Ok(VersionSelector::Tag(tag.clone())),
            (None, Some(branch)) => Ok(VersionSelector::Branch(branch.clone())),
            (None, None) => Ok(VersionSelector::Default),
        }
    }
}

impl VersionSelector {
    /// The ref name passed to git or substituted into archive URLs.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            VersionSelector::Tag(name) | VersionSelector::Branch(name) => Some(name),
            VersionSelector::Default => None,
        }
    }
}

/// One library section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDeclaration {
    /// Section name, unique within the file. Also the cache slot name.
    pub name: String,
    /// Provider tag as written in the `type` key.
    pub source_kind: String,
    /// Path slice or full repository URL.
    pub url: String,
    pub version: VersionSpec,
    /// Link mappings in declaration order. Never empty.
    pub links: Vec<LinkMapping>,
}

/// Parse a configuration document into library declarations, in file order.
pub fn parse(content: &str) -> Result<Vec<LibraryDeclaration>> {
    // Escapes would mangle Windows paths in link keys.
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(content, options).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: None,
    })?;

    reject_duplicate_sections(content)?;

    let link_key = Regex::new(r"^link_(from|to)(?:\.(\d+))?$")?;
    let mut libraries = Vec::new();

    for (section, properties) in ini.iter() {
        let Some(name) = section else {
            if let Some((key, _)) = properties.iter().next() {
                return Err(Error::ConfigParse {
                    message: format!("Key '{}' appears before any [library] section", key),
                    hint: Some(
                        "Start the file with a section header such as [MyLibrary]".into(),
                    ),
                });
            }
            continue;
        };

        libraries.push(parse_section(name.trim(), properties, &link_key)?);
    }

    Ok(libraries)
}

/// Read and parse a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<LibraryDeclaration>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("Cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Depending on the parser, a repeated section is either merged into the first
/// or kept separately, so headers are checked on the raw text.
fn reject_duplicate_sections(content: &str) -> Result<()> {
    let header = Regex::new(r"^\s*\[([^\]]*)\]")?;
    let mut seen = HashSet::new();
    for line in content.lines() {
        if let Some(captures) = header.captures(line) {
            let name = captures[1].trim();
            if !seen.insert(name.to_string()) {
                return Err(Error::config(format!("Library [{}] is declared twice", name)));
            }
        }
    }
    Ok(())
}

fn parse_section(
    name: &str,
    properties: &Properties,
    link_key: &Regex,
) -> Result<LibraryDeclaration> {
    let mut source_kind = None;
    let mut url = None;
    let mut version = VersionSpec::default();
    // Suffixes in the order their link_from keys appear.
    let mut from_order: Vec<String> = Vec::new();
    let mut froms: HashMap<String, String> = HashMap::new();
    let mut tos: HashMap<String, String> = HashMap::new();

    for (key, value) in properties.iter() {
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "type" => source_kind = non_empty(value),
            "url" => url = non_empty(value),
            "tag" => version.tag = non_empty(value),
            "branch" => version.branch = non_empty(value),
            _ => {
                let Some(captures) = link_key.captures(&key) else {
                    continue;
                };
                let suffix = captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if &captures[1] == "from" {
                    if !froms.contains_key(&suffix) {
                        from_order.push(suffix.clone());
                    }
                    froms.insert(suffix, value.to_string());
                } else {
                    tos.insert(suffix, value.to_string());
                }
            }
        }
    }

    let source_kind = source_kind.ok_or_else(|| missing_key(name, "type"))?;
    let url = url.ok_or_else(|| missing_key(name, "url"))?;

    let mut links = Vec::with_capacity(from_order.len());
    for suffix in &from_order {
        let Some(to) = tos.remove(suffix) else {
            return Err(Error::ConfigParse {
                message: format!(
                    "[{}] has {} without a matching {}",
                    name,
                    key_name("link_from", suffix),
                    key_name("link_to", suffix)
                ),
                hint: Some(format!("Add '{} = <path>'", key_name("link_to", suffix))),
            });
        };
        if to.is_empty() {
            return Err(Error::config(format!(
                "[{}] has an empty {}",
                name,
                key_name("link_to", suffix)
            )));
        }
        if crate::path::is_base_itself(Path::new(&to)) {
            return Err(Error::ConfigParse {
                message: format!(
                    "[{}] {} = {} points at the link root itself",
                    name,
                    key_name("link_to", suffix),
                    to
                ),
                hint: Some("Name a directory below the link root, e.g. 'vendor/lib'".into()),
            });
        }
        links.push(LinkMapping {
            from: PathBuf::from(&froms[suffix]),
            to: PathBuf::from(to),
        });
    }

    if let Some(orphan) = tos.keys().min() {
        return Err(Error::ConfigParse {
            message: format!(
                "[{}] has {} without a matching {}",
                name,
                key_name("link_to", orphan),
                key_name("link_from", orphan)
            ),
            hint: None,
        });
    }

    if links.is_empty() {
        return Err(Error::ConfigParse {
            message: format!("[{}] declares no links", name),
            hint: Some(
                "Add 'link_from = <path in library>' and 'link_to = <path in project>'".into(),
            ),
        });
    }

    Ok(LibraryDeclaration {
        name: name.to_string(),
        source_kind,
        url,
        version,
        links,
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn missing_key(library: &str, key: &str) -> Error {
    Error::ConfigParse {
        message: format!("[{}] is missing the required '{}' key", library, key),
        hint: None,
    }
}

fn key_name(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, suffix)
    }
}
