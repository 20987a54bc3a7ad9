//! Static file serving.
//!
//! Requests that do not resolve to a markdown page are served from the web
//! root by `tower-http`.

use std::path::Path;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Create the static file service for the web root.
pub(crate) fn static_service(web_root: &Path) -> ServeDir {
    ServeDir::new(web_root)
}

/// Serve a request from the web root.
pub(crate) async fn serve_static(service: ServeDir, request: Request<Body>) -> Response {
    match service.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
