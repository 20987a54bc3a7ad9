//! Render backend trait for format-specific rendering.
//!
//! The generic renderer walks markdown events and delegates the elements whose
//! markup differs between output flavors to a backend.

/// Backend trait for format-specific rendering operations.
///
/// Block-level hooks receive an optional element id. The renderer passes one
/// when pragma-line mode is enabled so that editors can map output elements
/// back to source lines.
pub trait RenderBackend {
    /// Render a fenced or indented code block.
    ///
    /// # Arguments
    ///
    /// * `lang` - Optional language identifier (e.g., "rust", "plantuml")
    /// * `content` - The code content
    /// * `id` - Optional element id
    /// * `out` - Output buffer to write to
    fn code_block(lang: Option<&str>, content: &str, id: Option<&str>, out: &mut String);

    /// Render blockquote start tag.
    ///
    /// `class` is set for GitHub-style alerts (`note`, `tip`, ...).
    fn blockquote_start(class: Option<&str>, id: Option<&str>, out: &mut String);

    /// Render blockquote end tag.
    fn blockquote_end(out: &mut String);

    /// Render an image.
    fn image(src: &str, alt: &str, title: &str, out: &mut String);

    /// Render a hard break.
    fn hard_break(out: &mut String) {
        out.push_str("<br />\n");
    }

    /// Render a horizontal rule.
    fn horizontal_rule(id: Option<&str>, out: &mut String) {
        out.push_str("<hr");
        push_id_attr(id, out);
        out.push_str(" />\n");
    }

    /// Render a task list marker.
    fn task_list_marker(checked: bool, out: &mut String) {
        if checked {
            out.push_str(r#"<input type="checkbox" checked disabled> "#);
        } else {
            out.push_str(r#"<input type="checkbox" disabled> "#);
        }
    }
}

/// Append ` id="..."` to `out` when an id is present.
pub(crate) fn push_id_attr(id: Option<&str>, out: &mut String) {
    if let Some(id) = id {
        out.push_str(" id=\"");
        out.push_str(id);
        out.push('"');
    }
}
