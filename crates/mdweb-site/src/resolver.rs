//! Mapping request paths to markdown files.
//!
//! A request is served as markdown when a [`FolderRule`] prefix matches it
//! and either:
//!
//! - the path ends in `.md` (always, regardless of rule flags), or
//! - the path has a file name without an extension, the rule processes
//!   extensionless URLs, no directory exists at the path and `<path>.md`
//!   exists. Paths ending in `/` have no file name and never match here.
//!
//! Rules are tried in [`FolderRegistry`] order and the first match wins.
//! Anything else is left to static file handling.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::folders::{FolderRegistry, FolderRule};

/// A request path resolved to a markdown file.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub physical_path: PathBuf,
    pub rule: &'a FolderRule,
}

/// Resolves request paths against folder rules under a web root.
#[derive(Debug, Clone)]
pub struct RequestResolver {
    web_root: PathBuf,
    registry: FolderRegistry,
}

impl RequestResolver {
    #[must_use]
    pub fn new(web_root: impl Into<PathBuf>, registry: FolderRegistry) -> Self {
        Self {
            web_root: web_root.into(),
            registry,
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    pub fn registry(&self) -> &FolderRegistry {
        &self.registry
    }

    /// Resolve a decoded request path (`/docs/intro`) to a markdown file.
    ///
    /// Returns `None` when no rule serves the path as markdown.
    #[must_use]
    pub fn resolve(&self, request_path: &str) -> Option<Resolution<'_>> {
        if request_path.is_empty() || has_parent_segment(request_path) {
            return None;
        }

        let file_name = request_path.rsplit('/').next().unwrap_or_default();
        let has_extension = file_name.contains('.');
        let has_md_extension = file_name.to_ascii_lowercase().ends_with(".md");
        let is_root = request_path == "/";

        for rule in self.registry.rules() {
            let prefix = rule.url_prefix();
            if !starts_with_ignore_case(request_path, prefix) {
                continue;
            }
            if is_root && prefix != "/" {
                continue;
            }

            let candidate = self.physical_path(request_path, rule);

            if has_md_extension {
                debug!(path = request_path, file = %candidate.display(), "Resolved markdown file");
                return Some(Resolution {
                    physical_path: candidate,
                    rule,
                });
            }

            if !rule.process_extensionless_urls || has_extension || file_name.is_empty() {
                continue;
            }
            if candidate.is_dir() {
                continue;
            }

            let mut md_path = candidate.into_os_string();
            md_path.push(".md");
            let md_path = PathBuf::from(md_path);
            if md_path.is_file() {
                debug!(path = request_path, file = %md_path.display(), "Resolved extensionless URL");
                return Some(Resolution {
                    physical_path: md_path,
                    rule,
                });
            }
        }

        None
    }

    /// Physical path for a request under `rule`, honoring its URL mask.
    fn physical_path(&self, request_path: &str, rule: &FolderRule) -> PathBuf {
        let relative = match rule.url_mask() {
            Some(mask) => format!("{}{}", rule.relative_path(), &request_path[mask.len()..]),
            None => request_path.to_owned(),
        };

        let mut path = self.web_root.clone();
        path.extend(relative.split('/').filter(|s| !s.is_empty()));
        path
    }
}

fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}
