//! Markdown rendering service.
//!
//! [`Markdown`] owns everything a render needs: the cached engines, the
//! registered render extensions, the sanitizer and the fetcher for remote
//! documents. One instance is shared by all request threads.
//!
//! A render runs these steps:
//!
//! 1. before-markdown hooks over the raw text
//! 2. the engine (`markdown -> html`)
//! 3. `@icon-` substitution, when enabled
//! 4. after-markdown hooks over the HTML
//! 5. sanitization, when requested
//!
//! [`Markdown::parse`] additionally runs the after-document hooks, treating the
//! fragment as the whole document.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use mdweb_diagrams::PlantUmlExtension;
use mdweb_renderer::{
    CommonMarkEngine, DEFAULT_TAG_DENYLIST, DocumentArgs, HtmlArgs, HtmlSanitizer, MarkdownArgs,
    MarkdownEngine, RenderContext, RenderExtensionManager, RenderOptions, SanitizeError,
    replace_icons,
};
use tracing::debug;

use crate::error::{LoadError, RenderError};
use crate::remote::{Fetcher, HttpFetcher, fixup_relative_paths, normalize_markdown_url};

/// Builds an engine for the given options.
///
/// Called once per pragma mode and again on every forced reload.
pub type EngineFactory = Arc<dyn Fn(RenderOptions) -> Arc<dyn MarkdownEngine> + Send + Sync>;

/// Configuration of the rendering service.
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Grammar options. `pragma_lines` is ignored and chosen per render.
    pub render: RenderOptions,
    /// Replace `@icon-` tokens in rendered HTML.
    pub replace_icons: bool,
    /// Pipe-separated tags removed by the sanitizer.
    pub sanitize_denylist: String,
    /// Timeout for fetching remote markdown.
    pub fetch_timeout: Duration,
    /// `PlantUML` server endpoint. `None` disables diagram embedding.
    pub plantuml_server_url: Option<String>,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            replace_icons: true,
            sanitize_denylist: DEFAULT_TAG_DENYLIST.to_owned(),
            fetch_timeout: Duration::from_secs(30),
            plantuml_server_url: None,
        }
    }
}

/// Per-call render options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Run the HTML sanitizer over the output.
    pub sanitize: bool,
    /// Tag block elements with `id="pragma-line-N"`.
    pub pragma_lines: bool,
    /// Rebuild the engine before rendering.
    pub force_reload: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn sanitized() -> Self {
        Self {
            sanitize: true,
            ..Self::default()
        }
    }
}

/// Cached engines, one per pragma mode.
#[derive(Default)]
struct Engines {
    standard: Option<Arc<dyn MarkdownEngine>>,
    pragma: Option<Arc<dyn MarkdownEngine>>,
}

impl Engines {
    fn slot(&mut self, pragma_lines: bool) -> &mut Option<Arc<dyn MarkdownEngine>> {
        if pragma_lines {
            &mut self.pragma
        } else {
            &mut self.standard
        }
    }

    fn get(&self, pragma_lines: bool) -> Option<Arc<dyn MarkdownEngine>> {
        if pragma_lines {
            self.pragma.clone()
        } else {
            self.standard.clone()
        }
    }
}

/// Markdown rendering service shared across requests.
///
/// # Thread Safety
///
/// - Engines are cached behind a `RwLock` and built under a `Mutex<()>`, so
///   concurrent first renders build a single engine per mode
/// - Extensions are read from a snapshot, so rendering never waits on
///   registration
pub struct Markdown {
    render: RenderOptions,
    replace_icons: bool,
    sanitizer: HtmlSanitizer,
    extensions: RenderExtensionManager,
    fetcher: Arc<dyn Fetcher>,
    engine_factory: EngineFactory,
    engines: RwLock<Engines>,
    build_lock: Mutex<()>,
}

impl Markdown {
    /// Create the service.
    ///
    /// Registers the `PlantUML` extension when a server URL is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the sanitizer denylist is invalid.
    pub fn new(config: MarkdownConfig) -> Result<Self, SanitizeError> {
        let sanitizer = HtmlSanitizer::new(&config.sanitize_denylist)?;

        let extensions = RenderExtensionManager::new();
        if let Some(url) = config.plantuml_server_url {
            extensions.add(Arc::new(PlantUmlExtension::new(url)));
        }

        Ok(Self {
            render: config.render,
            replace_icons: config.replace_icons,
            sanitizer,
            extensions,
            fetcher: Arc::new(HttpFetcher::new(config.fetch_timeout)),
            engine_factory: Arc::new(default_engine),
            engines: RwLock::new(Engines::default()),
            build_lock: Mutex::new(()),
        })
    }

    /// Replace the engine factory. Cached engines are dropped.
    #[must_use]
    pub fn with_engine_factory(
        mut self,
        factory: impl Fn(RenderOptions) -> Arc<dyn MarkdownEngine> + Send + Sync + 'static,
    ) -> Self {
        self.engine_factory = Arc::new(factory);
        self.engines = RwLock::new(Engines::default());
        self
    }

    /// Replace the fetcher used for remote markdown.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Registered render extensions.
    pub fn extensions(&self) -> &RenderExtensionManager {
        &self.extensions
    }

    pub fn sanitizer(&self) -> &HtmlSanitizer {
        &self.sanitizer
    }

    /// Cached engine for a pragma mode, built on first use.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn engine(&self, pragma_lines: bool) -> Arc<dyn MarkdownEngine> {
        if let Some(engine) = self.engines.read().unwrap().get(pragma_lines) {
            return engine;
        }

        let _guard = self.build_lock.lock().unwrap();
        if let Some(engine) = self.engines.read().unwrap().get(pragma_lines) {
            return engine;
        }
        self.build_engine(pragma_lines)
    }

    /// Rebuild the engine for a pragma mode.
    ///
    /// Renders already in flight keep the engine they started with.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn reload_engine(&self, pragma_lines: bool) -> Arc<dyn MarkdownEngine> {
        let _guard = self.build_lock.lock().unwrap();
        self.build_engine(pragma_lines)
    }

    /// Drop all cached engines.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn reload(&self) {
        let _guard = self.build_lock.lock().unwrap();
        *self.engines.write().unwrap() = Engines::default();
    }

    /// Build and store an engine. Callers hold `build_lock`.
    fn build_engine(&self, pragma_lines: bool) -> Arc<dyn MarkdownEngine> {
        let options = RenderOptions {
            pragma_lines,
            ..self.render
        };
        let engine = (self.engine_factory)(options);
        *self.engines.write().unwrap().slot(pragma_lines) = Some(Arc::clone(&engine));
        debug!(pragma_lines, "Built markdown engine");
        engine
    }

    /// Render markdown to an HTML fragment.
    ///
    /// Runs the before and after markdown hooks but not the after-document
    /// hooks. Empty input renders to an empty string without running hooks.
    ///
    /// # Errors
    ///
    /// Returns an error if a render extension fails.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn render_html(
        &self,
        markdown: &str,
        context: RenderContext<'_>,
        options: ParseOptions,
    ) -> Result<String, RenderError> {
        if markdown.is_empty() {
            return Ok(String::new());
        }

        let mut args = MarkdownArgs {
            markdown: markdown.to_owned(),
            context,
        };
        self.extensions.before_markdown_rendered(&mut args)?;

        let engine = if options.force_reload {
            self.reload_engine(options.pragma_lines)
        } else {
            self.engine(options.pragma_lines)
        };
        let mut html = engine.render(&args.markdown);

        if self.replace_icons {
            html = replace_icons(&html).into_owned();
        }

        let mut html_args = HtmlArgs {
            html,
            markdown: &args.markdown,
            context,
        };
        self.extensions.after_markdown_rendered(&mut html_args)?;

        Ok(if options.sanitize {
            self.sanitizer.sanitize(&html_args.html)
        } else {
            html_args.html
        })
    }

    /// Run the after-document hooks over a complete page.
    ///
    /// # Errors
    ///
    /// Returns an error if a render extension fails.
    pub fn after_document_rendered(&self, html: String) -> Result<String, RenderError> {
        let mut args = DocumentArgs { html };
        self.extensions.after_document_rendered(&mut args)?;
        Ok(args.html)
    }

    /// Render a standalone markdown document.
    ///
    /// # Errors
    ///
    /// Returns an error if a render extension fails.
    pub fn parse(&self, markdown: &str, options: ParseOptions) -> Result<String, RenderError> {
        let html = self.render_html(markdown, RenderContext::default(), options)?;
        if html.is_empty() {
            return Ok(html);
        }
        self.after_document_rendered(html)
    }

    /// Render a markdown file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::File`] if the file cannot be read, or an error if a
    /// render extension fails.
    pub fn parse_from_file(&self, path: &Path, options: ParseOptions) -> Result<String, RenderError> {
        let markdown = std::fs::read_to_string(path).map_err(|e| LoadError::File {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse(&markdown, options)
    }

    /// Fetch and render remote markdown.
    ///
    /// The URL is first rewritten for well-known hosts. With `fixup_base_url`
    /// relative links are rebased against the fetched URL.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Fetch`] if the document cannot be fetched, or an
    /// error if a render extension fails.
    pub fn parse_from_url(
        &self,
        url: &str,
        fixup_base_url: bool,
        options: ParseOptions,
    ) -> Result<String, RenderError> {
        let markdown = self.fetch_markdown(url, fixup_base_url)?;
        self.parse(&markdown, options)
    }

    /// Fetch remote markdown without rendering it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Fetch`] if the document cannot be fetched or the
    /// URL cannot serve as a base for relative links.
    pub fn fetch_markdown(&self, url: &str, fixup_base_url: bool) -> Result<String, LoadError> {
        let url = normalize_markdown_url(url, self.fetcher.as_ref());
        let fetch_error = |source| LoadError::Fetch {
            url: url.clone(),
            source,
        };

        debug!(url = %url, "Fetching markdown");
        let markdown = self.fetcher.fetch(&url).map_err(fetch_error)?;
        if !fixup_base_url {
            return Ok(markdown);
        }
        fixup_relative_paths(&markdown, &url).map_err(fetch_error)
    }

    /// Render markdown embedded in other markup.
    ///
    /// Leading and trailing line breaks are dropped. With `normalize_whitespace`
    /// the indentation of the first non-blank line is removed from every line.
    ///
    /// # Errors
    ///
    /// Returns an error if a render extension fails.
    pub fn parse_fragment(
        &self,
        text: &str,
        normalize_whitespace: bool,
        options: ParseOptions,
    ) -> Result<String, RenderError> {
        let text = text.trim_matches(['\n', '\r']);
        if normalize_whitespace {
            self.render_html(&dedent(text), RenderContext::default(), options)
        } else {
            self.render_html(text, RenderContext::default(), options)
        }
    }
}

impl std::fmt::Debug for Markdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Markdown")
            .field("render", &self.render)
            .field("replace_icons", &self.replace_icons)
            .field("sanitizer", &self.sanitizer)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

fn default_engine(options: RenderOptions) -> Arc<dyn MarkdownEngine> {
    Arc::new(CommonMarkEngine::new(options))
}

/// Remove the indentation of the first non-blank line from all lines.
///
/// Lines indented less than that lose only the whitespace they have.
#[must_use]
pub fn dedent(text: &str) -> String {
    let Some(first) = text.lines().find(|line| !line.trim().is_empty()) else {
        return text.to_owned();
    };
    let indent = first.len() - first.trim_start().len();
    if indent == 0 {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let strip = line
            .char_indices()
            .take(indent)
            .take_while(|(_, c)| c.is_whitespace())
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        out.push_str(&line[strip..]);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FetchError;
    use mdweb_renderer::{ExtensionError, FontAwesomeExtension, RenderExtension};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn markdown() -> Markdown {
        Markdown::new(MarkdownConfig::default()).unwrap()
    }

    struct StubFetcher(HashMap<String, String>);

    impl Fetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_owned(),
                status: 404,
            })
        }
    }

    struct Footer;

    impl RenderExtension for Footer {
        fn name(&self) -> &str {
            "Footer"
        }

        fn before_markdown_rendered(&self, args: &mut MarkdownArgs<'_>) -> Result<(), ExtensionError> {
            args.markdown.push_str("\n\n*Generated*");
            Ok(())
        }

        fn after_document_rendered(&self, args: &mut DocumentArgs) -> Result<(), ExtensionError> {
            args.html.push_str("<!-- end -->");
            Ok(())
        }
    }

    struct Broken;

    impl RenderExtension for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn after_markdown_rendered(&self, _args: &mut HtmlArgs<'_>) -> Result<(), ExtensionError> {
            Err(ExtensionError::new("boom"))
        }
    }

    #[test]
    fn test_parse_renders_html() {
        let html = markdown().parse("# Hello\n\n**bold**", ParseOptions::default()).unwrap();
        assert_eq!(
            html,
            "<h1 id=\"hello\">Hello</h1>\n<p><strong>bold</strong></p>\n"
        );
    }

    #[test]
    fn test_empty_input_renders_empty() {
        let md = markdown();
        md.extensions().add(Arc::new(Footer));
        assert_eq!(md.parse("", ParseOptions::default()).unwrap(), "");
        assert_eq!(md.parse_fragment("\n\r\n", true, ParseOptions::default()).unwrap(), "");
    }

    #[test]
    fn test_extensions_run_around_render() {
        let md = markdown();
        md.extensions().add(Arc::new(Footer));

        let html = md.parse("Text", ParseOptions::default()).unwrap();
        assert_eq!(html, "<p>Text</p>\n<p><em>Generated</em></p>\n<!-- end -->");

        let fragment = md
            .render_html("Text", RenderContext::default(), ParseOptions::default())
            .unwrap();
        assert!(!fragment.contains("<!-- end -->"));
    }

    #[test]
    fn test_extension_failure_aborts_render() {
        let md = markdown();
        md.extensions().add(Arc::new(Broken));

        let err = md.parse("Text", ParseOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::Extension(_)));
        assert_eq!(
            err.to_string(),
            "render extension 'Broken' failed after markdown rendering"
        );
    }

    #[test]
    fn test_icons_replaced_in_output() {
        let html = markdown().parse("Go @icon-home now", ParseOptions::default()).unwrap();
        assert_eq!(html, "<p>Go <i class=\"fas fa-home\"></i> now</p>\n");

        let config = MarkdownConfig {
            replace_icons: false,
            ..MarkdownConfig::default()
        };
        let md = Markdown::new(config).unwrap();
        let html = md.parse("Go @icon-home now", ParseOptions::default()).unwrap();
        assert_eq!(html, "<p>Go @icon-home now</p>\n");
    }

    #[test]
    fn test_icon_extension_rewrites_markdown() {
        let config = MarkdownConfig {
            replace_icons: false,
            ..MarkdownConfig::default()
        };
        let md = Markdown::new(config).unwrap();
        md.extensions().add(Arc::new(FontAwesomeExtension));

        let html = md.parse("@icon-regular-star", ParseOptions::default()).unwrap();
        assert_eq!(html, "<p><i class=\"far fa-star\"></i></p>\n");
    }

    #[test]
    fn test_sanitize_option() {
        let md = markdown();
        let source = "Hi <script>alert(1)</script> [x](javascript:alert(1))";

        let raw = md.parse(source, ParseOptions::default()).unwrap();
        assert!(raw.contains("<script>"));

        let clean = md.parse(source, ParseOptions::sanitized()).unwrap();
        assert!(!clean.contains("<script>"));
        assert!(!clean.contains("javascript:"));
        assert!(clean.contains("unsupported:"));
    }

    #[test]
    fn test_pragma_lines() {
        let options = ParseOptions {
            pragma_lines: true,
            ..ParseOptions::default()
        };
        let html = markdown().parse("# Title\n\nText", options).unwrap();
        assert_eq!(
            html,
            "<h1 id=\"pragma-line-0\">Title</h1>\n<p id=\"pragma-line-2\">Text</p>\n"
        );
    }

    #[test]
    fn test_engine_cached_per_mode() {
        let md = markdown();
        let standard = md.engine(false);
        let pragma = md.engine(true);

        assert!(Arc::ptr_eq(&standard, &md.engine(false)));
        assert!(Arc::ptr_eq(&pragma, &md.engine(true)));
        assert!(!Arc::ptr_eq(&standard, &pragma));
    }

    #[test]
    fn test_force_reload_rebuilds_engine() {
        let md = markdown();
        let before = md.engine(false);

        let options = ParseOptions {
            force_reload: true,
            ..ParseOptions::default()
        };
        md.parse("Text", options).unwrap();
        let after = md.engine(false);
        assert!(!Arc::ptr_eq(&before, &after));

        md.reload();
        assert!(!Arc::ptr_eq(&after, &md.engine(false)));
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let md = markdown().with_engine_factory(move |options| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(CommonMarkEngine::new(options))
        });

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| md.parse("# Concurrent", ParseOptions::default()).unwrap());
            }
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_engine_factory() {
        struct Upper;
        impl MarkdownEngine for Upper {
            fn render(&self, markdown: &str) -> String {
                markdown.to_uppercase()
            }
        }

        let md = markdown().with_engine_factory(|_| Arc::new(Upper));
        assert_eq!(md.parse("shout", ParseOptions::default()).unwrap(), "SHOUT");
    }

    #[test]
    fn test_plantuml_registered_from_config() {
        let config = MarkdownConfig {
            plantuml_server_url: Some("http://localhost/png/".to_owned()),
            ..MarkdownConfig::default()
        };
        let md = Markdown::new(config).unwrap();
        assert!(md.extensions().get("plantuml").is_some());

        let html = md
            .parse("```plantuml\nBob -> Alice : hello\n```", ParseOptions::default())
            .unwrap();
        assert!(html.contains(r#"<img src="http://localhost/png/SyfFKj2rKt3CoKnELR1Io4ZDoSa70000" alt="diagram" />"#));
    }

    #[test]
    fn test_invalid_denylist() {
        let config = MarkdownConfig {
            sanitize_denylist: "script|<bad>".to_owned(),
            ..MarkdownConfig::default()
        };
        assert!(Markdown::new(config).is_err());
    }

    #[test]
    fn test_parse_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.md");
        std::fs::write(&path, "## Section").unwrap();

        let md = markdown();
        let html = md.parse_from_file(&path, ParseOptions::default()).unwrap();
        assert_eq!(html, "<h2 id=\"section\">Section</h2>\n");

        let err = md
            .parse_from_file(&dir.path().join("missing.md"), ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::Load(LoadError::File { .. })));
        assert!(err.to_string().starts_with("Couldn't load markdown file"));
    }

    #[test]
    fn test_parse_from_url_normalizes_and_rebases() {
        let pages = HashMap::from([(
            "https://github.com/user/repo/raw/master/README.md".to_owned(),
            "See [docs](docs/intro.md)".to_owned(),
        )]);
        let md = markdown().with_fetcher(Arc::new(StubFetcher(pages)));

        let html = md
            .parse_from_url("https://github.com/user/repo", true, ParseOptions::default())
            .unwrap();
        assert_eq!(
            html,
            "<p>See <a href=\"https://github.com/user/repo/raw/master/docs/intro.md\">docs</a></p>\n"
        );

        let html = md
            .parse_from_url("https://github.com/user/repo", false, ParseOptions::default())
            .unwrap();
        assert_eq!(html, "<p>See <a href=\"docs/intro.md\">docs</a></p>\n");
    }

    #[test]
    fn test_parse_from_url_failure_is_load_error() {
        let md = markdown().with_fetcher(Arc::new(StubFetcher(HashMap::new())));
        let err = md
            .parse_from_url("https://example.com/missing.md", true, ParseOptions::default())
            .unwrap_err();
        match err {
            RenderError::Load(LoadError::Fetch { url, .. }) => {
                assert_eq!(url, "https://example.com/missing.md");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_fragment_normalizes_indentation() {
        let md = markdown();
        let text = "\n        # Title\n\n        Some *text*\n          indented more\n";
        let html = md.parse_fragment(text, true, ParseOptions::default()).unwrap();
        assert_eq!(
            html,
            "<h1 id=\"title\">Title</h1>\n<p>Some <em>text</em>\nindented more</p>\n"
        );

        let html = md.parse_fragment(text, false, ParseOptions::default()).unwrap();
        assert!(html.starts_with("<pre><code>"));
    }

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("  a\n    b\n c\n\n  d"), "a\n  b\nc\n\nd\n");
        assert_eq!(dedent("a\n  b"), "a\n  b");
        assert_eq!(dedent("\n\n   "), "\n\n   ");
    }
}
