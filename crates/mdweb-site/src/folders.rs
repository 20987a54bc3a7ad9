//! Folder rules mapping URL prefixes to markdown folders.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::document::Document;

/// View template used when a folder does not configure one.
pub const DEFAULT_VIEW_TEMPLATE: &str = "_markdown_page.html";

/// Request data passed to pre-process hooks.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub method: String,
    /// Decoded request path.
    pub path: String,
    pub query: Option<String>,
    /// Request headers with lowercase names.
    pub headers: HashMap<String, String>,
}

/// Callback invoked with the built document before the view is rendered.
pub type PreProcessHook = Arc<dyn Fn(&mut Document, &RequestContext) + Send + Sync>;

/// A virtual folder whose markdown files are served as rendered pages.
///
/// `relative_path` and `url_mask` always begin and end with `/`.
#[derive(Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct FolderRule {
    relative_path: String,
    url_mask: Option<String>,
    /// Template the rendered document is placed in, relative to the web root.
    pub view_template: String,
    /// Kept for configuration compatibility. It has no effect: explicit
    /// `.md` requests under the folder are always served as markdown.
    pub process_md_files: bool,
    /// Serve URLs without an extension from `<path>.md`.
    pub process_extensionless_urls: bool,
    /// Extract the page title from front matter or the first heading.
    pub extract_title: bool,
    /// Run the HTML sanitizer over rendered output.
    pub sanitize_html: bool,
    /// Base path for relative links; front matter `basePath` overrides it.
    pub base_path: Option<String>,
    pub pre_process: Option<PreProcessHook>,
}

impl FolderRule {
    /// Create a rule for a folder with default options.
    #[must_use]
    pub fn new(relative_path: &str) -> Self {
        Self {
            relative_path: normalize_folder_path(relative_path),
            url_mask: None,
            view_template: DEFAULT_VIEW_TEMPLATE.to_owned(),
            process_md_files: true,
            process_extensionless_urls: true,
            extract_title: true,
            sanitize_html: false,
            base_path: None,
            pre_process: None,
        }
    }

    /// Serve the folder under a different public URL prefix.
    ///
    /// A request for `<mask>rest` maps to the file `<relative_path>rest`.
    #[must_use]
    pub fn with_url_mask(mut self, url_mask: &str) -> Self {
        self.url_mask = Some(normalize_folder_path(url_mask));
        self
    }

    /// Place rendered documents in the given template, relative to the web root.
    #[must_use]
    pub fn with_view_template(mut self, view_template: impl Into<String>) -> Self {
        self.view_template = view_template.into();
        self
    }

    /// Set [`FolderRule::process_md_files`]. It does not change resolution.
    #[must_use]
    pub fn with_process_md_files(mut self, enabled: bool) -> Self {
        self.process_md_files = enabled;
        self
    }

    /// Serve `/path` from `/path.md` when no directory named `/path` exists.
    #[must_use]
    pub fn with_process_extensionless_urls(mut self, enabled: bool) -> Self {
        self.process_extensionless_urls = enabled;
        self
    }

    /// Take the title from front matter or the first heading.
    #[must_use]
    pub fn with_extract_title(mut self, enabled: bool) -> Self {
        self.extract_title = enabled;
        self
    }

    /// Run the HTML sanitizer over documents in this folder.
    #[must_use]
    pub fn with_sanitize_html(mut self, enabled: bool) -> Self {
        self.sanitize_html = enabled;
        self
    }

    /// Base path for relative links. An empty string clears it.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        self.base_path = (!base_path.is_empty()).then_some(base_path);
        self
    }

    /// Call `hook` with each built document and its request before the view
    /// is rendered.
    #[must_use]
    pub fn with_pre_process(
        mut self,
        hook: impl Fn(&mut Document, &RequestContext) + Send + Sync + 'static,
    ) -> Self {
        self.pre_process = Some(Arc::new(hook));
        self
    }

    /// Physical folder prefix, relative to the web root.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn url_mask(&self) -> Option<&str> {
        self.url_mask.as_deref()
    }

    /// Prefix request paths are matched against.
    pub fn url_prefix(&self) -> &str {
        self.url_mask.as_deref().unwrap_or(&self.relative_path)
    }
}

impl fmt::Debug for FolderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderRule")
            .field("relative_path", &self.relative_path)
            .field("url_mask", &self.url_mask)
            .field("view_template", &self.view_template)
            .field("process_md_files", &self.process_md_files)
            .field(
                "process_extensionless_urls",
                &self.process_extensionless_urls,
            )
            .field("extract_title", &self.extract_title)
            .field("sanitize_html", &self.sanitize_html)
            .field("base_path", &self.base_path)
            .field("pre_process", &self.pre_process.is_some())
            .finish()
    }
}

/// Ordered collection of folder rules.
///
/// Rules are kept sorted by `relative_path` (ascending, ordinal). Rules with
/// equal paths keep registration order.
#[derive(Clone, Debug, Default)]
pub struct FolderRegistry {
    rules: Vec<FolderRule>,
}

impl FolderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: FolderRule) -> &mut Self {
        let index = self
            .rules
            .partition_point(|r| r.relative_path <= rule.relative_path);
        self.rules.insert(index, rule);
        self
    }

    #[must_use]
    pub fn with(mut self, rule: FolderRule) -> Self {
        self.add(rule);
        self
    }

    pub fn rules(&self) -> &[FolderRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<FolderRule> for FolderRegistry {
    fn from_iter<I: IntoIterator<Item = FolderRule>>(iter: I) -> Self {
        let mut registry = Self::new();
        for rule in iter {
            registry.add(rule);
        }
        registry
    }
}

/// Normalize a folder path to begin and end with `/`, using `/` separators.
#[must_use]
pub fn normalize_folder_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_matches('/');
    if path.is_empty() {
        "/".to_owned()
    } else {
        format!("/{path}/")
    }
}
