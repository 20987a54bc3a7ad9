//! Markdown rendering for mdweb.
//!
//! This crate provides the pieces of the render pipeline that do not depend on
//! files or requests:
//!
//! - [`MarkdownRenderer`]: a pulldown-cmark event renderer generic over a
//!   [`RenderBackend`], with GitHub-style heading ids and pragma-line mode
//! - [`MarkdownEngine`]: the `markdown -> html` contract, with
//!   [`CommonMarkEngine`] as the default implementation
//! - [`RenderExtension`] and [`RenderExtensionManager`]: ordered hooks around
//!   rendering
//! - [`replace_icons`]: `@icon-` token substitution
//! - [`HtmlSanitizer`]: denylist-based cleanup of generated HTML
//!
//! # Example
//!
//! ```
//! use mdweb_renderer::{HtmlBackend, MarkdownRenderer};
//!
//! let html = MarkdownRenderer::<HtmlBackend>::new()
//!     .with_pragma_lines(true)
//!     .render_markdown("# Hello\n\n**Bold** text");
//! assert!(html.starts_with(r#"<h1 id="pragma-line-0">"#));
//! ```

mod backend;
mod engine;
pub mod extension;
mod html;
mod icons;
mod renderer;
mod sanitize;
mod state;
mod util;

pub use backend::RenderBackend;
pub use engine::{CommonMarkEngine, MarkdownEngine};
pub use extension::{
    DocumentArgs, ExtensionError, HookError, HookStage, HtmlArgs, MarkdownArgs, RenderContext,
    RenderExtension, RenderExtensionManager,
};
pub use html::HtmlBackend;
pub use icons::{FontAwesomeExtension, Icon, IconSet, replace_icons};
pub use renderer::{MarkdownRenderer, RenderOptions};
pub use sanitize::{DEFAULT_TAG_DENYLIST, HtmlSanitizer, SanitizeError};
pub use state::{escape_html, slugify};
