//! Font Awesome icon tokens.
//!
//! `@icon-[set-]<name>[-color:<value>][-spin]` is replaced with an `<i>`
//! element. The token ends at whitespace, `|`, `.`, `,`, `<` or end of text.
//!
//! | Token                        | Markup                                          |
//! |------------------------------|-------------------------------------------------|
//! | `@icon-home`                 | `<i class="fas fa-home"></i>`                   |
//! | `@icon-regular-home`         | `<i class="far fa-home"></i>`                   |
//! | `@icon-home-color:red`       | `<i class="fas fa-home" style="color: red"></i>`|
//! | `@icon-duotone-spinner-spin` | `<i class="fad fa-spinner fa-spin"></i>`        |

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::extension::{ExtensionError, MarkdownArgs, RenderExtension};
use crate::state::escape_html;

static ICON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@icon-([^\s|.,<]+)").unwrap());

/// Icon set selected by the token prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IconSet {
    Solid,
    Regular,
    Duotone,
    Light,
}

impl IconSet {
    fn class(self) -> &'static str {
        match self {
            Self::Solid => "fas",
            Self::Regular => "far",
            Self::Duotone => "fad",
            Self::Light => "fal",
        }
    }
}

/// A parsed icon token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Icon<'a> {
    pub set: IconSet,
    pub name: &'a str,
    pub color: Option<&'a str>,
    pub spin: bool,
}

impl<'a> Icon<'a> {
    /// Parse the part of a token after `@icon-`.
    ///
    /// Returns `None` when no icon name remains.
    pub fn parse(body: &'a str) -> Option<Self> {
        let (set, rest) = [
            ("regular-", IconSet::Regular),
            ("duotone-", IconSet::Duotone),
            ("solid-", IconSet::Solid),
            ("light-", IconSet::Light),
        ]
        .into_iter()
        .find_map(|(prefix, set)| body.strip_prefix(prefix).map(|rest| (set, rest)))
        .unwrap_or((IconSet::Solid, body));

        let (rest, spin) = match rest.strip_suffix("-spin") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };

        let (name, color) = match rest.split_once("-color:") {
            Some((name, color)) if !color.is_empty() => (name, Some(color)),
            Some((name, _)) => (name, None),
            None => (rest, None),
        };

        if name.is_empty() {
            return None;
        }
        Some(Self {
            set,
            name,
            color,
            spin,
        })
    }

    /// Render the icon as an `<i>` element.
    pub fn to_html(&self) -> String {
        let mut class = format!("{} fa-{}", self.set.class(), escape_html(self.name));
        if self.spin {
            class.push_str(" fa-spin");
        }
        match self.color {
            Some(color) => format!(
                r#"<i class="{class}" style="color: {}"></i>"#,
                escape_html(color)
            ),
            None => format!(r#"<i class="{class}"></i>"#),
        }
    }
}

/// Replace every icon token in `text` with icon markup.
pub fn replace_icons(text: &str) -> Cow<'_, str> {
    if !text.contains("@icon-") {
        return Cow::Borrowed(text);
    }
    ICON_PATTERN.replace_all(text, |caps: &Captures<'_>| {
        Icon::parse(&caps[1]).map_or_else(|| caps[0].to_owned(), |icon| icon.to_html())
    })
}

/// Render extension applying icon substitution to raw markdown.
#[derive(Debug, Default)]
pub struct FontAwesomeExtension;

impl RenderExtension for FontAwesomeExtension {
    fn name(&self) -> &str {
        "FontAwesome"
    }

    fn before_markdown_rendered(&self, args: &mut MarkdownArgs<'_>) -> Result<(), ExtensionError> {
        if let Cow::Owned(replaced) = replace_icons(&args.markdown) {
            args.markdown = replaced;
        }
        Ok(())
    }
}
