//! Remote markdown: fetching, host-specific URL rewriting and link rebasing.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use pulldown_cmark::{Event, Options, Parser, Tag};
use regex::Regex;
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

static ORIGINAL_CONTENT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-original_content_git_url="([^"]*)""#).unwrap());

/// Fetching remote text failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("invalid URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Source of remote text.
pub trait Fetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher with a global request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let http_error = |e: ureq::Error| FetchError::Http {
            url: url.to_owned(),
            message: e.to_string(),
        };

        let response = self.agent.get(url).call().map_err(http_error)?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status,
            });
        }

        response.into_body().read_to_string().map_err(http_error)
    }
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Rewrite URLs of well-known hosts to their raw markdown equivalent.
///
/// - Gists get `/raw` appended.
/// - Microsoft docs pages are fetched to find the markdown source URL.
/// - Bitbucket `/src/` becomes `/raw/`.
/// - GitHub repository URLs point at `README.md`, and `/blob/` becomes `/raw/`.
///
/// Other URLs are returned unchanged.
#[must_use]
pub fn normalize_markdown_url(url: &str, fetcher: &dyn Fetcher) -> String {
    normalize(url, fetcher, true)
}

fn normalize(url: &str, fetcher: &dyn Fetcher, follow_docs: bool) -> String {
    let lower = url.to_lowercase();

    if lower.contains("gist.github.com") {
        if lower.contains("/raw") {
            return url.to_owned();
        }
        return format!("{url}/raw");
    }

    if lower.contains("docs.microsoft.com") || lower.contains("learn.microsoft.com") {
        if lower.contains(".md") || !follow_docs {
            return url.to_owned();
        }
        return match source_url_of_docs_page(url, fetcher) {
            Some(source) => normalize(&source, fetcher, false),
            None => url.to_owned(),
        };
    }

    if lower.contains("/bitbucket.org/") && lower.contains("/src/") {
        return url.replace("/src/", "/raw/");
    }

    if lower.contains("/github.com/") {
        let mut url = url.to_owned();
        if !lower.contains(".md") {
            if !url.ends_with('/') {
                url.push('/');
            }
            url.push_str("blob/master/README.md");
        }
        if url.contains("/blob/") {
            url = url.replace("/blob/", "/raw/");
        }
        return url;
    }

    url.to_owned()
}

/// Markdown source URL embedded in a docs page.
fn source_url_of_docs_page(url: &str, fetcher: &dyn Fetcher) -> Option<String> {
    let page = match fetcher.fetch(url) {
        Ok(page) => page,
        Err(e) => {
            warn!(url, error = %e, "Failed to look up markdown source of docs page");
            return None;
        }
    };
    let source = ORIGINAL_CONTENT_URL.captures(&page)?.get(1)?.as_str();
    if source.is_empty() {
        return None;
    }
    debug!(url, source, "Found markdown source of docs page");
    Some(source.to_owned())
}

/// Rebase relative link and image targets against `base_url`.
///
/// Only inline links placed directly in top-level paragraphs are rewritten.
/// Targets containing `://` are left alone. Every `](target)` occurrence of a
/// rewritten target is replaced in the source text.
pub fn fixup_relative_paths(markdown: &str, base_url: &str) -> Result<String, FetchError> {
    let invalid = |source| FetchError::InvalidUrl {
        url: base_url.to_owned(),
        source,
    };
    let base = Url::parse(base_url).map_err(invalid)?;

    let mut targets = Vec::new();
    let mut stack: Vec<bool> = Vec::new();
    for event in Parser::new_ext(markdown, Options::ENABLE_YAML_STYLE_METADATA_BLOCKS) {
        match event {
            Event::Start(tag) => {
                let in_top_paragraph = stack.as_slice() == [true];
                match &tag {
                    Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. }
                        if in_top_paragraph =>
                    {
                        targets.push(dest_url.to_string());
                    }
                    _ => {}
                }
                let is_top_paragraph = stack.is_empty() && matches!(tag, Tag::Paragraph);
                stack.push(is_top_paragraph);
            }
            Event::End(_) => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut seen = HashSet::new();
    let mut result = markdown.to_owned();
    for target in targets {
        if target.is_empty() || target.contains("://") || !seen.insert(target.clone()) {
            continue;
        }
        let rebased = base.join(&target).map_err(invalid)?;
        result = result.replace(&format!("]({target})"), &format!("]({rebased})"));
    }
    Ok(result)
}
