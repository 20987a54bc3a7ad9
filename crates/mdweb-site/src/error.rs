//! Error types for loading and rendering markdown.

use std::path::PathBuf;

use mdweb_renderer::HookError;

use crate::remote::FetchError;

/// Markdown source could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Couldn't load markdown file: {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Couldn't load markdown from URL: {url}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Rendering markdown to HTML failed.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Extension(#[from] HookError),
}

/// Building a document for a resolved request failed.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file vanished after resolution.
    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Document is empty: {}", .0.display())]
    Empty(PathBuf),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DocumentError {
    /// Whether the request should be answered as not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Empty(_))
    }
}
