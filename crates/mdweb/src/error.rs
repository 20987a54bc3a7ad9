//! CLI error types.

use mdweb_config::ConfigError;
use mdweb_renderer::SanitizeError;
use mdweb_site::RenderError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Sanitize(#[from] SanitizeError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Server(String),
}
