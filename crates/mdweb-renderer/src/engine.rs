//! The `markdown -> html` contract consumed by the render pipeline.

use crate::html::HtmlBackend;
use crate::renderer::{MarkdownRenderer, RenderOptions};

/// A markdown grammar engine producing HTML.
///
/// Implementations must be shareable across request threads.
pub trait MarkdownEngine: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Default engine backed by pulldown-cmark and [`HtmlBackend`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CommonMarkEngine {
    options: RenderOptions,
}

impl CommonMarkEngine {
    #[must_use]
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> RenderOptions {
        self.options
    }
}

impl MarkdownEngine for CommonMarkEngine {
    fn render(&self, markdown: &str) -> String {
        MarkdownRenderer::<HtmlBackend>::new()
            .with_options(self.options)
            .render_markdown(markdown)
    }
}
