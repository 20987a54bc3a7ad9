//! `mdweb render` command implementation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdweb_config::{CliSettings, Config};
use mdweb_server::markdown_config;
use mdweb_site::{Markdown, ParseOptions};

use crate::error::CliError;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file, `http(s)://` URL, or `-` for stdin.
    input: String,

    /// Path to configuration file (default: auto-discover mdweb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strip denylisted tags and script attributes from the output.
    #[arg(long)]
    sanitize: bool,

    /// Tag block elements with `id="pragma-line-N"` source line ids.
    #[arg(long)]
    pragma_lines: bool,

    /// Keep relative links in remote documents as written.
    #[arg(long)]
    no_fixup_base_url: bool,

    /// Treat the input as an indented fragment and strip its common indentation.
    #[arg(long, conflicts_with = "no_fixup_base_url")]
    fragment: bool,

    /// `PlantUML` server URL for diagrams (overrides config).
    #[arg(long, env = "MDWEB_PLANTUML_SERVER_URL")]
    plantuml_server_url: Option<String>,
}

/// Where the markdown comes from.
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    Stdin,
    Url(&'a str),
    File(&'a Path),
}

impl<'a> Source<'a> {
    fn parse(input: &'a str) -> Self {
        if input == "-" {
            Self::Stdin
        } else if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input)
        } else {
            Self::File(Path::new(input))
        }
    }
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the input cannot be loaded
    /// or rendered.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            plantuml_server_url: self.plantuml_server_url.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");
        let markdown = Markdown::new(markdown_config(&config))?;

        let html = self.render(&markdown)?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(html.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn options(&self) -> ParseOptions {
        ParseOptions {
            sanitize: self.sanitize,
            pragma_lines: self.pragma_lines,
            force_reload: false,
        }
    }

    fn render(&self, markdown: &Markdown) -> Result<String, CliError> {
        let options = self.options();
        let html = match Source::parse(&self.input) {
            Source::Url(url) => markdown.parse_from_url(url, !self.no_fixup_base_url, options)?,
            Source::File(path) if !self.fragment => markdown.parse_from_file(path, options)?,
            Source::File(path) => {
                markdown.parse_fragment(&std::fs::read_to_string(path)?, true, options)?
            }
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                if self.fragment {
                    markdown.parse_fragment(&text, true, options)?
                } else {
                    markdown.parse(&text, options)?
                }
            }
        };
        Ok(html)
    }
}
