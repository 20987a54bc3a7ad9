//! HTTP server for mdweb.
//!
//! Serves a web root where configured folders of markdown files are rendered
//! as HTML pages:
//! - Requests resolving to a markdown file are rendered, placed in the
//!   folder's view template and returned with caching headers
//! - Everything else is served as a static file from the web root
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mdweb_server::{ServerConfig, run_server};
//! use mdweb_site::{FolderRegistry, FolderRule, MarkdownConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_owned(),
//!         port: 7979,
//!         web_root: PathBuf::from("wwwroot"),
//!         default_documents: vec!["index.md".to_owned()],
//!         folders: FolderRegistry::new().with(FolderRule::new("/docs/")),
//!         markdown: MarkdownConfig::default(),
//!         version: "1.0.0".to_owned(),
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (mdweb-server)
//!                        │
//!                        ├─► default document rewrite (`/docs/` → `/docs/index.md`)
//!                        │
//!                        ├─► RequestResolver ──► Document ──► view template
//!                        │
//!                        └─► Static files (tower-http ServeDir)
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;
mod static_files;
mod view;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use mdweb_renderer::RenderOptions;
use mdweb_site::{FolderRegistry, FolderRule, Markdown, MarkdownConfig, RequestResolver};
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served by the site.
    pub web_root: PathBuf,
    /// Files tried, in order, for requests ending in `/`.
    pub default_documents: Vec<String>,
    /// Folders served as markdown.
    pub folders: FolderRegistry,
    /// Markdown rendering service configuration.
    pub markdown: MarkdownConfig,
    /// Application version (for `ETag` invalidation).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            web_root: PathBuf::from("wwwroot"),
            default_documents: vec!["index.md".to_owned()],
            folders: FolderRegistry::new().with(FolderRule::new("/")),
            markdown: MarkdownConfig::default(),
            version: String::new(),
        }
    }
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let markdown = Arc::new(Markdown::new(config.markdown.clone())?);
    run_server_with(config, markdown).await
}

/// Run the server with an existing render service.
///
/// Use this to register render extensions before serving.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server_with(
    config: ServerConfig,
    markdown: Arc<Markdown>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(
        address = %addr,
        web_root = %config.web_root.display(),
        folders = config.folders.len(),
        "Starting server"
    );

    let app = router(config, markdown);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router without binding a listener.
#[must_use]
pub fn router(config: ServerConfig, markdown: Arc<Markdown>) -> Router {
    let state = Arc::new(AppState {
        markdown,
        static_files: static_files::static_service(&config.web_root),
        resolver: RequestResolver::new(config.web_root, config.folders),
        default_documents: config.default_documents,
        version: config.version,
    });
    app::create_router(state)
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from mdweb config.
#[must_use]
pub fn server_config_from_config(config: &mdweb_config::Config, version: String) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        web_root: config.site_resolved.web_root.clone(),
        default_documents: config.site_resolved.default_documents.clone(),
        folders: folder_registry(&config.folders),
        markdown: markdown_config(config),
        version,
    }
}

/// Create the render service configuration from mdweb config.
#[must_use]
pub fn markdown_config(config: &mdweb_config::Config) -> MarkdownConfig {
    MarkdownConfig {
        render: RenderOptions {
            gfm: config.markdown.gfm,
            heading_ids: config.markdown.heading_ids,
            pragma_lines: false,
        },
        replace_icons: config.markdown.icons,
        sanitize_denylist: config.markdown.sanitize_tag_denylist.clone(),
        fetch_timeout: Duration::from_secs(config.markdown.fetch_timeout_secs),
        plantuml_server_url: config.plantuml_server_url().map(str::to_owned),
    }
}

/// Build folder rules from configured folders.
#[must_use]
pub fn folder_registry(folders: &[mdweb_config::FolderConfig]) -> FolderRegistry {
    folders
        .iter()
        .map(|folder| {
            let mut rule = FolderRule::new(&folder.path)
                .with_process_md_files(folder.process_md_files)
                .with_process_extensionless_urls(folder.process_extensionless_urls)
                .with_extract_title(folder.extract_title)
                .with_sanitize_html(folder.sanitize_html);
            if let Some(mask) = &folder.url_mask {
                rule = rule.with_url_mask(mask);
            }
            if let Some(template) = &folder.view_template {
                rule = rule.with_view_template(template.as_str());
            }
            if let Some(base_path) = &folder.base_path {
                rule = rule.with_base_path(base_path.as_str());
            }
            rule
        })
        .collect()
}
