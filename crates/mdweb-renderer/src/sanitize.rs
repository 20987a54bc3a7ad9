//! Denylist-based HTML sanitizing.
//!
//! This is not a parser-based sanitizer. It covers common script injection
//! patterns in generated HTML:
//!
//! - Elements named in the denylist are removed from the opening tag through
//!   the first closing tag of any denied name. Matching does not nest, so
//!   `<script><script></script>x</script>` leaves `x</script>` behind.
//! - `href`, `src`, `dynsrc` and `lowsrc` values starting (within 20
//!   characters) with `javascript:` or an `&#` entity get that marker replaced
//!   with `unsupported:`.
//! - Inline event handler attributes (`on<name>="..."`) are removed.

use std::sync::LazyLock;

use regex::Regex;

/// Tags removed when no denylist is configured.
pub const DEFAULT_TAG_DENYLIST: &str = "script|iframe|object|embed|form";

static DEFAULT_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| tag_pattern(DEFAULT_TAG_DENYLIST).unwrap());

static SCRIPT_URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<[^>]*?\s(href|src|dynsrc|lowsrc)=.{0,20}((javascript:)|(&#)).*?>").unwrap()
});

static EVENT_HANDLER_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[^>]*?\s(on[^\s\\]{0,20}=(".*?"|'.*?')).*?(>|/>)"#).unwrap()
});

/// Error for an unusable tag denylist.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("invalid tag name '{0}' in sanitizer denylist")]
    InvalidTag(String),
    #[error("invalid sanitizer denylist: {0}")]
    Pattern(#[from] regex::Error),
}

/// Strips scriptable markup from HTML using a tag denylist.
#[derive(Clone, Debug)]
pub struct HtmlSanitizer {
    denylist: String,
    tag_pattern: Option<Regex>,
}

impl HtmlSanitizer {
    /// Create a sanitizer from a pipe-separated list of tag names.
    ///
    /// An empty list disables element removal; attribute cleanup still runs.
    pub fn new(denylist: &str) -> Result<Self, SanitizeError> {
        let tags = parse_denylist(denylist)?;
        let tag_pattern = if tags.is_empty() {
            None
        } else {
            Some(tag_pattern(&tags.join("|"))?)
        };
        Ok(Self {
            denylist: tags.join("|"),
            tag_pattern,
        })
    }

    /// The normalized denylist.
    pub fn denylist(&self) -> &str {
        &self.denylist
    }

    /// Sanitize an HTML string.
    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }

        let mut result = match &self.tag_pattern {
            Some(pattern) => pattern.replace_all(html, "").into_owned(),
            None => html.to_owned(),
        };

        // Each match covers a whole tag but rewrites a single attribute, so
        // repeat until tags with several offending attributes are clean.
        while let Some(next) = rewrite_group(&result, &SCRIPT_URL_ATTR, 2, "unsupported:") {
            result = next;
        }
        while let Some(next) = rewrite_group(&result, &EVENT_HANDLER_ATTR, 1, "") {
            result = next;
        }

        result
    }
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self {
            denylist: DEFAULT_TAG_DENYLIST.to_owned(),
            tag_pattern: Some(DEFAULT_TAG_PATTERN.clone()),
        }
    }
}

fn parse_denylist(denylist: &str) -> Result<Vec<String>, SanitizeError> {
    denylist
        .split('|')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            let valid = tag.starts_with(|c: char| c.is_ascii_alphabetic())
                && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if valid {
                Ok(tag.to_ascii_lowercase())
            } else {
                Err(SanitizeError::InvalidTag(tag.to_owned()))
            }
        })
        .collect()
}

fn tag_pattern(tags: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?is)<({tags})\b.*?</({tags})>"))
}

/// Replace capture `group` of every match with `replacement`.
///
/// Returns `None` when nothing matched.
fn rewrite_group(html: &str, pattern: &Regex, group: usize, replacement: &str) -> Option<String> {
    let mut output = String::with_capacity(html.len());
    let mut last = 0;
    let mut matched = false;

    for caps in pattern.captures_iter(html) {
        let Some(span) = caps.get(group) else {
            continue;
        };
        matched = true;
        output.push_str(&html[last..span.start()]);
        output.push_str(replacement);
        last = span.end();
    }

    if !matched {
        return None;
    }
    output.push_str(&html[last..]);
    Some(output)
}
