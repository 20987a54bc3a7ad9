//! Rendered markdown documents.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mdweb_renderer::RenderContext;
use tracing::debug;

use crate::error::{DocumentError, LoadError};
use crate::folders::FolderRule;
use crate::front_matter::extract_metadata;
use crate::markdown::{Markdown, ParseOptions};
use crate::resolver::Resolution;

/// A markdown page ready to be placed in a view template.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: Option<String>,
    pub raw_markdown: String,
    /// Front matter block without delimiters.
    pub yaml_header: Option<String>,
    /// Rendered HTML fragment.
    pub rendered_html: String,
    /// Request path the document was resolved from.
    pub relative_path: String,
    pub physical_path: PathBuf,
    /// Base path for relative links; front matter wins over the folder rule.
    pub base_path: Option<String>,
    pub folder_rule: FolderRule,
    /// Modification time of the source file.
    pub last_modified: Option<SystemTime>,
}

impl Document {
    /// Read, analyze and render the file a request resolved to.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if the file does not exist,
    /// [`DocumentError::Empty`] if it has no content, and load or render
    /// errors otherwise.
    pub fn load(
        markdown: &Markdown,
        resolution: &Resolution<'_>,
        request_path: &str,
    ) -> Result<Self, DocumentError> {
        let path = &resolution.physical_path;
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(path.clone()));
            }
            Err(e) => {
                return Err(LoadError::File {
                    path: path.clone(),
                    source: e,
                }
                .into());
            }
        };
        if source.trim().is_empty() {
            return Err(DocumentError::Empty(path.clone()));
        }

        let last_modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let mut document =
            Self::from_source(markdown, source, resolution.rule, request_path, path)?;
        document.last_modified = last_modified;
        debug!(path = request_path, file = %path.display(), "Rendered markdown document");
        Ok(document)
    }

    /// Build a document from markdown source already in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if a render extension fails.
    pub fn from_source(
        markdown: &Markdown,
        source: String,
        rule: &FolderRule,
        request_path: &str,
        physical_path: &Path,
    ) -> Result<Self, DocumentError> {
        let meta = extract_metadata(&source, rule.extract_title);
        let base_path = meta.base_path.or_else(|| rule.base_path.clone());

        let context = RenderContext {
            relative_path: Some(request_path),
            base_path: base_path.as_deref(),
            yaml_header: meta.yaml_header.as_deref(),
        };
        let options = ParseOptions {
            sanitize: rule.sanitize_html,
            ..ParseOptions::default()
        };
        let rendered_html = markdown.render_html(&source, context, options)?;

        Ok(Self {
            title: meta.title,
            raw_markdown: source,
            yaml_header: meta.yaml_header,
            rendered_html,
            relative_path: request_path.to_owned(),
            physical_path: physical_path.to_path_buf(),
            base_path,
            folder_rule: rule.clone(),
            last_modified: None,
        })
    }
}
