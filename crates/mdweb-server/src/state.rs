//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use mdweb_site::{Markdown, RequestResolver};
use tower_http::services::ServeDir;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Render service shared by all requests.
    pub(crate) markdown: Arc<Markdown>,
    /// Maps request paths to markdown files.
    pub(crate) resolver: RequestResolver,
    /// Static file service for the web root.
    pub(crate) static_files: ServeDir,
    /// Files tried, in order, for requests ending in `/`.
    pub(crate) default_documents: Vec<String>,
    /// Application version for cache invalidation.
    pub(crate) version: String,
}

impl AppState {
    /// Rewrite a directory request to its first existing default document.
    ///
    /// Paths not ending in `/`, paths with `..` segments and directories
    /// without a default document are returned unchanged.
    pub(crate) fn with_default_document(&self, path: &str) -> String {
        if !path.ends_with('/') || path.split(['/', '\\']).any(|segment| segment == "..") {
            return path.to_owned();
        }

        let dir = self.resolver.web_root().join(path.trim_start_matches('/'));
        self.default_documents
            .iter()
            .find(|document| dir.join(document).is_file())
            .map_or_else(|| path.to_owned(), |document| format!("{path}{document}"))
    }
}
