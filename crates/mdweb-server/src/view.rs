//! View templates.
//!
//! A folder's view template is an HTML file under the web root with
//! `{{title}}`, `{{content}}`, `{{base_path}}` and `{{yaml}}` placeholders.
//! Content is inserted as is; the other values are HTML-escaped. When the
//! template file does not exist a built-in layout is used.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use mdweb_renderer::escape_html;
use mdweb_site::Document;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(title|content|base_path|yaml)\s*\}\}").unwrap());

/// Place a document in its folder's view template.
///
/// # Errors
///
/// Returns an error if the template exists but cannot be read.
pub(crate) fn render_page(web_root: &Path, document: &Document) -> std::io::Result<String> {
    let template_path = web_root.join(document.folder_rule.view_template.trim_start_matches('/'));
    match std::fs::read_to_string(&template_path) {
        Ok(template) => Ok(fill_template(&template, document)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(
                template = %template_path.display(),
                "View template not found, using built-in layout"
            );
            Ok(builtin_layout(document))
        }
        Err(e) => Err(e),
    }
}

/// Substitute placeholders in a single pass, so rendered content is never rescanned.
fn fill_template(template: &str, document: &Document) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "content" => document.rendered_html.clone(),
            "title" => escape_html(document.title.as_deref().unwrap_or_default()),
            "base_path" => escape_html(document.base_path.as_deref().unwrap_or_default()),
            _ => escape_html(document.yaml_header.as_deref().unwrap_or_default()),
        })
        .into_owned()
}

fn builtin_layout(document: &Document) -> String {
    let title = escape_html(document.title.as_deref().unwrap_or_default());
    let mut head = format!("<meta charset=\"utf-8\">\n<title>{title}</title>\n");
    if let Some(base_path) = &document.base_path {
        head.push_str(&format!("<base href=\"{}\">\n", escape_html(base_path)));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n{head}</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        document.rendered_html
    )
}
