//! Generic markdown renderer with pluggable backend.

use std::fmt::Write;
use std::marker::PhantomData;

use pulldown_cmark::{BlockQuoteKind, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::backend::{RenderBackend, push_id_attr};
use crate::state::{CodeBlockState, HeadingState, ImageState, TableState, escape_html};
use crate::util::{LineIndex, heading_level_to_num};

/// Options controlling the markdown grammar and the generated markup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderOptions {
    /// Enable GitHub Flavored Markdown (tables, strikethrough, task lists, alerts).
    pub gfm: bool,
    /// Give headings GitHub-style slug ids.
    pub heading_ids: bool,
    /// Tag block-level elements with `id="pragma-line-N"` (zero-based source line).
    pub pragma_lines: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            heading_ids: true,
            pragma_lines: false,
        }
    }
}

/// Generic markdown renderer with pluggable backend.
///
/// Uses the [`RenderBackend`] trait to delegate format-specific rendering
/// while handling common elements (tables, lists, inline formatting) generically.
/// A leading YAML front matter block is recognized and never rendered.
pub struct MarkdownRenderer<B: RenderBackend> {
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    heading: HeadingState,
    pending_image: Option<(String, String)>,
    pending_heading_id: Option<String>,
    code_block_id: Option<String>,
    in_metadata: bool,
    options: RenderOptions,
    _backend: PhantomData<B>,
}

impl<B: RenderBackend> MarkdownRenderer<B> {
    /// Create a new renderer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: String::with_capacity(4096),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            heading: HeadingState::default(),
            pending_image: None,
            pending_heading_id: None,
            code_block_id: None,
            in_metadata: false,
            options: RenderOptions::default(),
            _backend: PhantomData,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable GitHub Flavored Markdown features.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.options.gfm = enabled;
        self
    }

    /// Enable or disable pragma-line ids on block-level elements.
    ///
    /// Pragma ids take precedence over heading slug ids.
    #[must_use]
    pub fn with_pragma_lines(mut self, enabled: bool) -> Self {
        self.options.pragma_lines = enabled;
        self
    }

    /// Get parser options based on configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        let mut options = Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
        if self.options.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM;
        }
        options
    }

    /// Render markdown text to HTML.
    pub fn render_markdown(&mut self, markdown: &str) -> String {
        let lines = self.options.pragma_lines.then(|| LineIndex::new(markdown));
        let parser = Parser::new_ext(markdown, self.parser_options()).into_offset_iter();
        for (event, range) in parser {
            let line = lines.as_ref().map(|index| index.line_of(range.start));
            self.process_event(event, line);
        }
        std::mem::take(&mut self.output)
    }

    /// Push content to output or heading buffer based on context.
    fn push_inline(&mut self, content: &str) {
        if self.image.is_active() {
            // Markup inside alt text is dropped.
            return;
        }
        if self.heading.is_active() {
            self.heading.push_html(content);
        } else {
            self.output.push_str(content);
        }
    }

    fn process_event(&mut self, event: Event<'_>, line: Option<usize>) {
        match event {
            Event::Start(tag) => self.start_tag(tag, pragma_id(line)),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => {
                let mut out = String::new();
                B::hard_break(&mut out);
                self.push_inline(&out);
            }
            Event::Rule => B::horizontal_rule(pragma_id(line).as_deref(), &mut self.output),
            Event::TaskListMarker(checked) => B::task_list_marker(checked, &mut self.output),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>, id: Option<String>) {
        match tag {
            Tag::Paragraph => {
                self.output.push_str("<p");
                push_id_attr(id.as_deref(), &mut self.output);
                self.output.push('>');
            }
            Tag::Heading { level, .. } => {
                // Opening tag is written in end_tag once the slug is known.
                self.heading.start_heading(heading_level_to_num(level));
                self.pending_heading_id = id;
            }
            Tag::BlockQuote(kind) => {
                B::blockquote_start(kind.map(alert_class), id.as_deref(), &mut self.output);
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(ref info) => info
                        .split_whitespace()
                        .next()
                        .map(ToOwned::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
                self.code_block_id = id;
            }
            Tag::List(start) => {
                match start {
                    Some(1) => self.output.push_str("<ol"),
                    Some(n) => write!(self.output, r#"<ol start="{n}""#).unwrap(),
                    None => self.output.push_str("<ul"),
                }
                push_id_attr(id.as_deref(), &mut self.output);
                self.output.push_str(">\n");
            }
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock => {}
            Tag::MetadataBlock(_) => self.in_metadata = true,
            Tag::DefinitionList => self.output.push_str("<dl>\n"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table");
                push_id_attr(id.as_deref(), &mut self.output);
                self.output.push_str(">\n");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead>\n<tr>\n");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>\n");
            }
            Tag::TableCell => {
                let align = self.table.current_alignment_style();
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                write!(self.output, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<del>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = format!(r#"<a href="{}""#, escape_html(&dest_url));
                if !title.is_empty() {
                    write!(link, r#" title="{}""#, escape_html(&title)).unwrap();
                }
                link.push('>');
                self.push_inline(&link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                // Alt text is collected until the end tag.
                self.image.start();
                self.pending_image = Some((dest_url.to_string(), title.to_string()));
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>\n"),
            TagEnd::Heading(_) => {
                if let Some((level, slug, html)) = self.heading.complete_heading() {
                    let id = self
                        .pending_heading_id
                        .take()
                        .or_else(|| self.options.heading_ids.then_some(slug));
                    write!(self.output, "<h{level}").unwrap();
                    push_id_attr(id.as_deref(), &mut self.output);
                    writeln!(self.output, ">{}</h{level}>", html.trim()).unwrap();
                }
            }
            TagEnd::BlockQuote(_) => B::blockquote_end(&mut self.output),
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                let id = self.code_block_id.take();
                B::code_block(lang.as_deref(), &content, id.as_deref(), &mut self.output);
            }
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => self.output.push_str("</li>\n"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock => {}
            TagEnd::MetadataBlock(_) => self.in_metadata = false,
            TagEnd::DefinitionList => self.output.push_str("</dl>\n"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>\n"),
            TagEnd::Table => self.output.push_str("</tbody>\n</table>\n"),
            TagEnd::TableHead => {
                self.output.push_str("</tr>\n</thead>\n<tbody>\n");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>\n"),
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>\n"
                } else {
                    "</td>\n"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</del>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => {
                let alt = self.image.end();
                if let Some((src, title)) = self.pending_image.take() {
                    let mut img = String::new();
                    B::image(&src, &alt, &title, &mut img);
                    self.push_inline(&img);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_metadata {
            return;
        }
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else {
            if self.heading.is_active() {
                self.heading.push_text(text);
            }
            self.push_inline(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
            return;
        }
        if self.heading.is_active() {
            self.heading.push_text(code);
        }
        self.push_inline(&format!("<code>{}</code>", escape_html(code)));
    }

    fn soft_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str(" ");
            return;
        }
        if self.heading.is_active() {
            self.heading.push_text(" ");
        }
        self.push_inline("\n");
    }
}

impl<B: RenderBackend> Default for MarkdownRenderer<B> {
    fn default() -> Self {
        Self::new()
    }
}

fn pragma_id(line: Option<usize>) -> Option<String> {
    line.map(|line| format!("pragma-line-{line}"))
}

fn alert_class(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}
