//! State structs tracking context during event processing.

use std::collections::HashMap;

use pulldown_cmark::Alignment;

/// State for tracking code block rendering.
///
/// Text inside a fenced or indented block is buffered so render extensions
/// see the whole block at once.
#[derive(Default)]
pub struct CodeBlockState {
    active: bool,
    language: Option<String>,
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block with optional language.
    pub fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    /// End the current code block and return (language, content).
    pub fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }

    /// Whether a code block is being captured.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append text to the captured block.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking table rendering.
///
/// Tracks whether cells belong to the header row and which column the next
/// cell is in, so each cell gets its column alignment.
#[derive(Default)]
pub struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    /// Start a new table with column alignments.
    pub fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    /// Enter the header row.
    pub fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub fn end_head(&mut self) {
        self.in_head = false;
    }

    /// Start a body row at the first column.
    pub fn start_row(&mut self) {
        self.cell_index = 0;
    }

    /// Move to the next column.
    pub fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// Get the alignment style for the current cell.
    pub fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align: left;""#,
            Some(Alignment::Center) => r#" style="text-align: center;""#,
            Some(Alignment::Right) => r#" style="text-align: right;""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// State for tracking image alt text capture.
///
/// Alt text is the plain text of the image's inline children, with markup
/// dropped.
#[derive(Default)]
pub struct ImageState {
    active: bool,
    alt_text: String,
}

impl ImageState {
    /// Begin capturing alt text for a new image.
    pub fn start(&mut self) {
        self.active = true;
        self.alt_text.clear();
    }

    /// End image capture and return the alt text.
    pub fn end(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.alt_text)
    }

    /// Whether alt text is being captured.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// State for tracking headings and generating unique heading ids.
///
/// Ids are unique within one render. A repeated slug gets a numeric suffix.
#[derive(Default)]
pub struct HeadingState {
    /// Current heading level being processed (None if not in a heading).
    current_level: Option<u8>,
    /// Plain text of the heading, used for the slug.
    text: String,
    /// Heading HTML with inline formatting.
    html: String,
    /// Times each base slug has been used.
    id_counts: HashMap<String, usize>,
}

impl HeadingState {
    pub fn is_active(&self) -> bool {
        self.current_level.is_some()
    }

    /// Begin a heading at `level`, discarding any partial text.
    pub fn start_heading(&mut self, level: u8) {
        self.current_level = Some(level);
        self.text.clear();
        self.html.clear();
    }

    /// Complete the heading and return (level, slug id, html).
    ///
    /// Returns `None` if not in a heading.
    pub fn complete_heading(&mut self) -> Option<(u8, String, String)> {
        let level = self.current_level.take()?;
        let text = std::mem::take(&mut self.text);
        let html = std::mem::take(&mut self.html);
        let id = self.generate_id(&text);
        Some((level, id, html))
    }

    /// Generate a unique id for a heading, suffixing repeats with `-1`, `-2`, ...
    fn generate_id(&mut self, text: &str) -> String {
        let base_id = slugify(text);
        let count = self.id_counts.entry(base_id.clone()).or_default();
        let id = match *count {
            0 => base_id,
            n => format!("{base_id}-{n}"),
        };
        *count += 1;
        id
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }
}

/// Convert text to URL-safe slug.
///
/// Lowercases, replaces whitespace/dashes/underscores with single dashes
/// and removes other non-alphanumeric characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}
