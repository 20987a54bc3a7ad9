//! Markdown page handler.
//!
//! Resolves the request path against the folder rules, renders the markdown
//! document into its view template and returns it with caching headers.
//! Requests that do not resolve are served as static files.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use mdweb_site::{Document, RequestContext};

use crate::error::ServerError;
use crate::handlers::decode_path;
use crate::state::AppState;
use crate::static_files::serve_static;
use crate::view;

/// A page ready to be sent.
struct RenderedPage {
    html: String,
    last_modified: Option<SystemTime>,
}

/// Handle any request: render a markdown page or serve a static file.
pub(crate) async fn serve_page(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<Response, ServerError> {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return Ok(serve_static(state.static_files.clone(), request).await);
    }

    let context = request_context(&request);
    let worker = Arc::clone(&state);
    let page = tokio::task::spawn_blocking(move || render_request(&worker, &context)).await??;

    match page {
        Some(page) => Ok(page_response(&state.version, page, request.headers())),
        None => Ok(serve_static(state.static_files.clone(), request).await),
    }
}

/// Capture the request data passed to pre-process hooks.
fn request_context(request: &Request<Body>) -> RequestContext {
    let headers = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect::<HashMap<_, _>>();

    RequestContext {
        method: request.method().as_str().to_owned(),
        path: decode_path(request.uri().path()),
        query: request.uri().query().map(str::to_owned),
        headers,
    }
}

/// Resolve and render a request. Returns `None` when no folder rule claims it.
fn render_request(
    state: &AppState,
    context: &RequestContext,
) -> Result<Option<RenderedPage>, ServerError> {
    let path = state.with_default_document(&context.path);
    let Some(resolution) = state.resolver.resolve(&path) else {
        return Ok(None);
    };
    tracing::debug!(
        path = %path,
        file = %resolution.physical_path.display(),
        "Resolved markdown request"
    );

    let mut document = Document::load(&state.markdown, &resolution, &path)?;
    if let Some(hook) = document.folder_rule.pre_process.clone() {
        hook(&mut document, context);
    }

    let html = view::render_page(state.resolver.web_root(), &document)?;
    let html = state.markdown.after_document_rendered(html)?;

    Ok(Some(RenderedPage {
        html,
        last_modified: document.last_modified,
    }))
}

fn page_response(version: &str, page: RenderedPage, headers: &HeaderMap) -> Response {
    let etag = compute_etag(version, &page.html);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let mut response = (
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, max-age=60".to_owned()),
        ],
        Html(page.html),
    )
        .into_response();

    if let Some(modified) = page.last_modified {
        let modified: DateTime<Utc> = modified.into();
        if let Ok(value) =
            HeaderValue::from_str(&modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        {
            response.headers_mut().insert(header::LAST_MODIFIED, value);
        }
    }

    response
}

/// Compute `ETag` from version and content.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use axum::Router;
    use mdweb_renderer::{DocumentArgs, ExtensionError, RenderExtension};
    use mdweb_site::{FolderRegistry, FolderRule, Markdown, MarkdownConfig};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    fn app(web_root: &Path, folders: FolderRegistry) -> Router {
        app_with(web_root, folders, Markdown::new(MarkdownConfig::default()).unwrap())
    }

    fn app_with(web_root: &Path, folders: FolderRegistry, markdown: Markdown) -> Router {
        let config = ServerConfig {
            web_root: web_root.to_path_buf(),
            folders,
            version: "1.0.0".to_owned(),
            ..ServerConfig::default()
        };
        crate::router(config, Arc::new(markdown))
    }

    fn docs_site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/intro.md"), "# Welcome\n\nHello.").unwrap();
        fs::write(dir.path().join("docs/index.md"), "# Docs home").unwrap();
        fs::write(dir.path().join("style.css"), "body {}").unwrap();
        dir
    }

    async fn get(app: &Router, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_compute_etag_includes_version() {
        let etag1 = compute_etag("1.0.0", "content");
        let etag2 = compute_etag("1.0.1", "content");

        assert_ne!(etag1, etag2);
    }

    #[test]
    fn test_compute_etag_includes_content() {
        let etag1 = compute_etag("1.0.0", "content1");
        let etag2 = compute_etag("1.0.0", "content2");

        assert_ne!(etag1, etag2);
    }

    #[test]
    fn test_compute_etag_format() {
        let etag = compute_etag("1.0.0", "content");

        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        // 16 hex chars + 2 quotes = 18 total
        assert_eq!(etag.len(), 18);
    }

    #[tokio::test]
    async fn test_renders_markdown_page() {
        let dir = docs_site();
        let app = app(dir.path(), FolderRegistry::new().with(FolderRule::new("/docs/")));

        let response = get(&app, "/docs/intro").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "private, max-age=60");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers.contains_key(header::ETAG));
        assert!(headers.contains_key(header::LAST_MODIFIED));

        let body = body_text(response).await;
        assert!(body.contains("<title>Welcome</title>"));
        assert!(body.contains("<h1 id=\"welcome\">Welcome</h1>"));
    }

    #[tokio::test]
    async fn test_matching_etag_returns_not_modified() {
        let dir = docs_site();
        let app = app(dir.path(), FolderRegistry::new().with(FolderRule::new("/docs/")));

        let first = get(&app, "/docs/intro.md").await;
        let etag = first.headers()[header::ETAG].clone();

        let request = Request::builder()
            .uri("/docs/intro.md")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_directory_request_uses_default_document() {
        let dir = docs_site();
        let app = app(dir.path(), FolderRegistry::new().with(FolderRule::new("/docs/")));

        let response = get(&app, "/docs/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Docs home"));
    }

    #[tokio::test]
    async fn test_unmatched_paths_serve_static_files() {
        let dir = docs_site();
        let app = app(dir.path(), FolderRegistry::new().with(FolderRule::new("/docs/")));

        let response = get(&app, "/style.css").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(body_text(response).await, "body {}");
    }

    #[tokio::test]
    async fn test_missing_markdown_file_is_not_found() {
        let dir = docs_site();
        let app = app(dir.path(), FolderRegistry::new().with(FolderRule::new("/docs/")));

        assert_eq!(get(&app, "/docs/missing.md").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/docs/%2e%2e/style.css").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_masked_folder_with_view_template() {
        let dir = docs_site();
        fs::write(
            dir.path().join("layout.html"),
            "<h1 class=\"page\">{{title}}</h1>{{content}}",
        )
        .unwrap();
        let rule = FolderRule::new("/docs/")
            .with_url_mask("/Help/")
            .with_view_template("/layout.html");
        let app = app(dir.path(), FolderRegistry::new().with(rule));

        let response = get(&app, "/help/intro").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "<h1 class=\"page\">Welcome</h1><h1 id=\"welcome\">Welcome</h1>\n<p>Hello.</p>\n"
        );
    }

    #[tokio::test]
    async fn test_pre_process_hook_sees_request() {
        let dir = docs_site();
        let rule = FolderRule::new("/docs/").with_pre_process(|document, context| {
            if let Some(query) = &context.query {
                document.title = Some(format!("{} ({query})", context.path));
            }
        });
        let app = app(dir.path(), FolderRegistry::new().with(rule));

        let body = body_text(get(&app, "/docs/intro?print=1").await).await;

        assert!(body.contains("<title>/docs/intro (print=1)</title>"));
    }

    #[tokio::test]
    async fn test_after_document_hooks_run_on_final_page() {
        struct Footer;

        impl RenderExtension for Footer {
            fn name(&self) -> &str {
                "Footer"
            }

            fn after_document_rendered(&self, args: &mut DocumentArgs) -> Result<(), ExtensionError> {
                args.html.push_str("<!-- footer -->");
                Ok(())
            }
        }

        let dir = docs_site();
        let markdown = Markdown::new(MarkdownConfig::default()).unwrap();
        markdown.extensions().add(Arc::new(Footer));
        let app = app_with(
            dir.path(),
            FolderRegistry::new().with(FolderRule::new("/docs/")),
            markdown,
        );

        let body = body_text(get(&app, "/docs/intro").await).await;

        assert!(body.ends_with("</html>\n<!-- footer -->"));
    }

    #[test]
    fn test_request_context_decodes_path() {
        let request = Request::builder()
            .uri("/docs/getting%20started?x=1")
            .header("X-Custom", "value")
            .body(Body::empty())
            .unwrap();

        let context = request_context(&request);

        assert_eq!(context.method, "GET");
        assert_eq!(context.path, "/docs/getting started");
        assert_eq!(context.query.as_deref(), Some("x=1"));
        assert_eq!(context.headers.get("x-custom").map(String::as_str), Some("value"));
    }
}
