//! `mdweb serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdweb_config::{CliSettings, Config};
use mdweb_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover mdweb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Web root directory (overrides config).
    #[arg(short, long)]
    web_root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// `PlantUML` server URL for diagrams (overrides config).
    #[arg(long, env = "MDWEB_PLANTUML_SERVER_URL")]
    plantuml_server_url: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            web_root: self.web_root,
            plantuml_server_url: self.plantuml_server_url,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");

        if !config.site_resolved.web_root.is_dir() {
            return Err(CliError::Server(format!(
                "Web root is not a directory: {}",
                config.site_resolved.web_root.display()
            )));
        }

        output.highlight(&format!(
            "Starting server on http://{}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Web root: {}",
            config.site_resolved.web_root.display()
        ));
        for folder in &config.folders {
            match &folder.url_mask {
                Some(mask) => output.info(&format!("Markdown folder: {} (as {mask})", folder.path)),
                None => output.info(&format!("Markdown folder: {}", folder.path)),
            }
        }
        if let Some(url) = config.plantuml_server_url() {
            output.info(&format!("PlantUML server: {url}"));
        } else {
            output.info("Diagrams: disabled");
        }

        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
