//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use mdweb_site::{DocumentError, RenderError};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Document could not be loaded or rendered.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Final page rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// I/O error, e.g. reading a view template.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking render task failed.
    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Document(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Page render failed");
        } else {
            tracing::debug!(error = %self, "Page not found");
        }

        let code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or_default();
        let body = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n\
             <body><h1>{code} {reason}</h1></body>\n</html>\n"
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_not_found_statuses() {
        assert_eq!(
            ServerError::Document(DocumentError::NotFound(PathBuf::from("a.md"))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Document(DocumentError::Empty(PathBuf::from("a.md"))).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_io_error_is_internal() {
        let err = ServerError::Io(std::io::Error::other("denied"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
