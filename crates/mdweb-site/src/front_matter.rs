//! Title and front matter extraction.
//!
//! Front matter is only recognized at the very start of the document and must
//! close within the first 50 lines. Headings used as a title fallback must
//! appear within the first 10 lines.
//!
//! `title: ` and `basePath: ` values are taken verbatim through end of line,
//! so quotes and `#` characters are part of the value.

const FRONT_MATTER_LINES: usize = 50;
const TITLE_LINES: usize = 10;
const DELIMITER: &str = "---";

/// Metadata extracted from the top of a markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// Front matter block without delimiters, trimmed.
    pub yaml_header: Option<String>,
    /// `basePath` declared in front matter.
    pub base_path: Option<String>,
}

/// Fields read from the front matter block.
#[derive(Default)]
struct Fields {
    title: Option<String>,
    base_path: Option<String>,
}

/// Extract metadata from markdown source.
///
/// `basePath` is always read. Title and YAML header are only extracted when
/// `extract_title` is set. Unterminated front matter is ignored.
#[must_use]
pub fn extract_metadata(markdown: &str, extract_title: bool) -> FrontMatter {
    let normalized = markdown.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().take(FRONT_MATTER_LINES).collect();

    let mut meta = FrontMatter::default();

    let yaml = if normalized.starts_with(DELIMITER) {
        front_matter_block(&lines)
    } else {
        None
    };

    if let Some(yaml) = &yaml {
        let fields = parse_fields(yaml);
        meta.base_path = fields.base_path.filter(|p| !p.is_empty());
        if extract_title {
            meta.title = fields.title.filter(|t| !t.is_empty());
            meta.yaml_header = Some(yaml.trim().to_owned());
        }
    }

    if !extract_title || meta.title.is_some() {
        return meta;
    }

    let head = &lines[..lines.len().min(TITLE_LINES)];
    meta.title = atx_title(head).or_else(|| setext_title(head));
    meta
}

/// Lines between the opening delimiter and the next line starting with `---`.
fn front_matter_block(lines: &[&str]) -> Option<String> {
    let end = lines
        .iter()
        .skip(1)
        .position(|line| line.starts_with(DELIMITER))?;
    Some(lines[1..=end].join("\n"))
}

/// First `key: value` line for each field; values are trimmed of whitespace only.
fn parse_fields(yaml: &str) -> Fields {
    let value = |key: &str| {
        yaml.lines()
            .find_map(|line| line.strip_prefix(key))
            .map(|v| v.trim().to_owned())
    };
    Fields {
        title: value("title: "),
        base_path: value("basePath: "),
    }
}

fn atx_title(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| line.trim_start().starts_with("# "))
        .map(|line| {
            line.trim_start_matches([' ', '\t', '#'])
                .trim_end()
                .to_owned()
        })
        .filter(|title| !title.is_empty())
}

fn setext_title(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.trim_start().starts_with("==="))
        .map(|(index, _)| lines[index - 1].trim().to_owned())
        .filter(|title| !title.is_empty())
}
