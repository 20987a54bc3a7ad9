//! `PlantUML` render extension.
//!
//! Replaces fenced code blocks tagged `plantuml` with an image served by a
//! `PlantUML` server:
//!
//! ````markdown
//! ```plantuml
//! Bob -> Alice : hello
//! ```
//! ````
//!
//! becomes `<img src="<server><token>" alt="diagram" />`. For the public
//! server the image links to the online editor.

use std::sync::LazyLock;

use mdweb_renderer::{ExtensionError, MarkdownArgs, RenderExtension, escape_html};
use regex::{Captures, Regex};
use tracing::debug;

use crate::consts::{DEFAULT_SERVER_URL, EDITOR_SEGMENT, FORMAT_SEGMENTS, PUBLIC_HOST};
use crate::encoding::encode_diagram;

static PLANTUML_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?msR)^```plantuml[ \t]*$(.*?)^```[ \t]*$").unwrap());

/// Render extension embedding `PlantUML` diagrams as server-rendered images.
#[derive(Clone, Debug)]
pub struct PlantUmlExtension {
    server_url: String,
    editor_url: Option<String>,
}

impl PlantUmlExtension {
    /// Create an extension rendering through the given server endpoint.
    ///
    /// The URL is the full endpoint the encoded diagram is appended to, for
    /// example `https://plantuml.example.com/svg/`.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        let editor_url = editor_url(&server_url);
        Self {
            server_url,
            editor_url,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Build the `<img>` markup for a single diagram source.
    pub fn diagram_html(&self, source: &str) -> Result<String, ExtensionError> {
        let token = encode_diagram(source)
            .map_err(|e| ExtensionError::with_source("failed to encode PlantUML diagram", e))?;
        let src = format!("{}{token}", self.server_url);
        let img = format!(r#"<img src="{}" alt="diagram" />"#, escape_html(&src));

        Ok(match &self.editor_url {
            Some(editor) => format!(
                r#"<a href="{}{token}" target="_blank">{img}</a>"#,
                escape_html(editor)
            ),
            None => img,
        })
    }

    /// Replace every `plantuml` block in `markdown`.
    ///
    /// Returns `None` when the markdown contains no diagrams.
    pub fn replace_blocks(&self, markdown: &str) -> Result<Option<String>, ExtensionError> {
        if !markdown.contains("```plantuml") {
            return Ok(None);
        }

        let mut error = None;
        let replaced = PLANTUML_BLOCK.replace_all(markdown, |caps: &Captures<'_>| {
            let source = caps[1].trim_matches(|c| matches!(c, ' ' | '`' | '\n' | '\r'));
            match self.diagram_html(source) {
                Ok(html) => html,
                Err(e) => {
                    error.get_or_insert(e);
                    caps[0].to_owned()
                }
            }
        });

        if let Some(e) = error {
            return Err(e);
        }
        Ok(Some(replaced.into_owned()))
    }
}

impl Default for PlantUmlExtension {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl RenderExtension for PlantUmlExtension {
    fn name(&self) -> &str {
        "PlantUml"
    }

    fn before_markdown_rendered(&self, args: &mut MarkdownArgs<'_>) -> Result<(), ExtensionError> {
        if let Some(markdown) = self.replace_blocks(&args.markdown)? {
            debug!(server = %self.server_url, "Embedded PlantUML diagrams");
            args.markdown = markdown;
        }
        Ok(())
    }
}

/// Editor link prefix for servers hosting the online editor.
fn editor_url(server_url: &str) -> Option<String> {
    if !server_url.contains(PUBLIC_HOST) {
        return None;
    }
    let editor = FORMAT_SEGMENTS
        .iter()
        .fold(server_url.to_owned(), |url, segment| {
            url.replace(segment, EDITOR_SEGMENT)
        });
    Some(editor)
}
