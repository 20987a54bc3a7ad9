//! HTML backend for markdown rendering.

use std::fmt::Write;

use crate::backend::{RenderBackend, push_id_attr};
use crate::state::escape_html;

/// HTML render backend.
///
/// Produces CommonMark-style HTML: `<pre><code class="language-x">` for code
/// blocks, `<blockquote>` for quotes and `<img>` for images.
pub struct HtmlBackend;

impl RenderBackend for HtmlBackend {
    fn code_block(lang: Option<&str>, content: &str, id: Option<&str>, out: &mut String) {
        out.push_str("<pre");
        push_id_attr(id, out);
        out.push('>');
        if let Some(lang) = lang {
            write!(
                out,
                r#"<code class="language-{}">{}</code></pre>"#,
                escape_html(lang),
                escape_html(content)
            )
            .unwrap();
        } else {
            write!(out, "<code>{}</code></pre>", escape_html(content)).unwrap();
        }
        out.push('\n');
    }

    fn blockquote_start(class: Option<&str>, id: Option<&str>, out: &mut String) {
        out.push_str("<blockquote");
        if let Some(class) = class {
            write!(out, r#" class="alert alert-{class}""#).unwrap();
        }
        push_id_attr(id, out);
        out.push_str(">\n");
    }

    fn blockquote_end(out: &mut String) {
        out.push_str("</blockquote>\n");
    }

    fn image(src: &str, alt: &str, title: &str, out: &mut String) {
        let title_attr = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        write!(
            out,
            r#"<img src="{}" alt="{}"{title_attr} />"#,
            escape_html(src),
            escape_html(alt)
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_block_with_language() {
        let mut out = String::new();
        HtmlBackend::code_block(Some("rust"), "let a = 1 < 2;", None, &mut out);
        assert_eq!(
            out,
            "<pre><code class=\"language-rust\">let a = 1 &lt; 2;</code></pre>\n"
        );
    }

    #[test]
    fn test_code_block_with_id() {
        let mut out = String::new();
        HtmlBackend::code_block(None, "x", Some("pragma-line-3"), &mut out);
        assert_eq!(out, "<pre id=\"pragma-line-3\"><code>x</code></pre>\n");
    }

    #[test]
    fn test_alert_blockquote() {
        let mut out = String::new();
        HtmlBackend::blockquote_start(Some("note"), None, &mut out);
        assert_eq!(out, "<blockquote class=\"alert alert-note\">\n");
    }

    #[test]
    fn test_image_with_title() {
        let mut out = String::new();
        HtmlBackend::image("a.png", "An \"image\"", "Title", &mut out);
        assert_eq!(
            out,
            r#"<img src="a.png" alt="An &quot;image&quot;" title="Title" />"#
        );
    }
}
