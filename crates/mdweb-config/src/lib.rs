//! Configuration management for mdweb.
//!
//! Parses `mdweb.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `diagrams.plantuml_server_url`
//! - `folders[].base_path`
//!
//! ## Example
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [site]
//! web_root = "public"
//!
//! [[folders]]
//! path = "/docs/"
//! sanitize_html = true
//!
//! [[folders]]
//! path = "/posts/"
//! url_mask = "/blog/"
//! view_template = "_post.html"
//! ```

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the web root directory.
    pub web_root: Option<PathBuf>,
    /// Override the `PlantUML` server URL.
    pub plantuml_server_url: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdweb.toml";

/// Public `PlantUML` PNG endpoint.
const DEFAULT_PLANTUML_SERVER_URL: &str = "http://www.plantuml.com/plantuml/png/";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Markdown rendering configuration.
    pub markdown: MarkdownConfig,
    /// Diagram configuration.
    pub diagrams: DiagramsConfig,
    /// Folders served as markdown, in file order.
    pub folders: Vec<FolderConfig>,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
        }
    }
}

/// Raw site configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    web_root: Option<String>,
    default_documents: Option<Vec<String>>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Directory served by the site.
    pub web_root: PathBuf,
    /// Files tried, in order, for requests ending in `/`.
    pub default_documents: Vec<String>,
}

/// Markdown rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Pipe-separated tags removed by the HTML sanitizer.
    pub sanitize_tag_denylist: String,
    /// Enable GitHub Flavored Markdown extensions.
    pub gfm: bool,
    /// Give headings slug ids.
    pub heading_ids: bool,
    /// Replace `@icon-` tokens with icon markup.
    pub icons: bool,
    /// Timeout for fetching remote markdown, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            sanitize_tag_denylist: "script|iframe|object|embed|form".to_owned(),
            gfm: true,
            heading_ids: true,
            icons: true,
            fetch_timeout_secs: 30,
        }
    }
}

/// `PlantUML` diagram configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Server endpoint encoded diagrams are appended to.
    pub plantuml_server_url: String,
    /// Whether `plantuml` code blocks are embedded as images.
    pub enabled: bool,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            plantuml_server_url: DEFAULT_PLANTUML_SERVER_URL.to_owned(),
            enabled: true,
        }
    }
}

/// A folder served as markdown.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FolderConfig {
    /// Folder path relative to the web root, e.g. `/docs/`.
    pub path: String,
    /// Public URL prefix when it differs from `path`.
    pub url_mask: Option<String>,
    /// View template relative to the web root.
    pub view_template: Option<String>,
    pub process_md_files: bool,
    pub process_extensionless_urls: bool,
    pub extract_title: bool,
    pub sanitize_html: bool,
    /// Base path for relative links.
    pub base_path: Option<String>,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            path: "/".to_owned(),
            url_mask: None,
            view_template: None,
            process_md_files: true,
            process_extensionless_urls: true,
            extract_title: true,
            sanitize_html: false,
            base_path: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`MDWEB_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdweb.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(web_root) = &settings.web_root {
            self.site_resolved.web_root.clone_from(web_root);
        }
        if let Some(url) = &settings.plantuml_server_url {
            self.diagrams.plantuml_server_url.clone_from(url);
        }
    }

    /// `PlantUML` server URL when diagrams are enabled.
    #[must_use]
    pub fn plantuml_server_url(&self) -> Option<&str> {
        self.diagrams
            .enabled
            .then_some(self.diagrams.plantuml_server_url.as_str())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            site: SiteConfigRaw::default(),
            markdown: MarkdownConfig::default(),
            diagrams: DiagramsConfig::default(),
            folders: vec![FolderConfig::default()],
            site_resolved: SiteConfig {
                web_root: base.join("wwwroot"),
                default_documents: default_documents(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_markdown()?;
        self.validate_diagrams()?;
        self.validate_folders()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_markdown(&self) -> Result<(), ConfigError> {
        let invalid = self
            .markdown
            .sanitize_tag_denylist
            .split('|')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .find(|tag| !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        if let Some(tag) = invalid {
            return Err(ConfigError::Validation(format!(
                "markdown.sanitize_tag_denylist contains invalid tag name '{tag}'"
            )));
        }
        if self.markdown.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "markdown.fetch_timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        if self.diagrams.enabled {
            let url = &self.diagrams.plantuml_server_url;
            require_non_empty(url, "diagrams.plantuml_server_url")?;
            require_http_url(url, "diagrams.plantuml_server_url")?;
        }
        Ok(())
    }

    fn validate_folders(&self) -> Result<(), ConfigError> {
        if self.folders.is_empty() {
            return Err(ConfigError::Validation(
                "at least one folder must be configured".to_owned(),
            ));
        }
        for (index, folder) in self.folders.iter().enumerate() {
            require_non_empty(&folder.path, &format!("folders[{index}].path"))?;
            if let Some(mask) = &folder.url_mask {
                require_non_empty(mask, &format!("folders[{index}].url_mask"))?;
            }
            if let Some(template) = &folder.view_template {
                require_non_empty(template, &format!("folders[{index}].view_template"))?;
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.diagrams.plantuml_server_url = expand::expand_env(
            &self.diagrams.plantuml_server_url,
            "diagrams.plantuml_server_url",
        )?;

        for (index, folder) in self.folders.iter_mut().enumerate() {
            if let Some(ref base_path) = folder.base_path {
                folder.base_path = Some(expand::expand_env(
                    base_path,
                    &format!("folders[{index}].base_path"),
                )?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    ///
    /// A site without configured folders serves the whole web root.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.site_resolved = SiteConfig {
            web_root: config_dir.join(self.site.web_root.as_deref().unwrap_or("wwwroot")),
            default_documents: self
                .site
                .default_documents
                .clone()
                .unwrap_or_else(default_documents),
        };

        if self.folders.is_empty() {
            self.folders.push(FolderConfig::default());
        }
    }
}

fn default_documents() -> Vec<String> {
    vec!["index.md".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7979);
        assert_eq!(config.site_resolved.web_root, PathBuf::from("/test/wwwroot"));
        assert_eq!(config.site_resolved.default_documents, vec!["index.md"]);
        assert_eq!(config.folders, vec![FolderConfig::default()]);
        assert_eq!(
            config.plantuml_server_url(),
            Some("http://www.plantuml.com/plantuml/png/")
        );
        assert!(config.markdown.icons);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7979);
        assert_eq!(config.folders, vec![FolderConfig::default()]);
        assert_eq!(config.markdown.sanitize_tag_denylist, "script|iframe|object|embed|form");
        assert_eq!(config.markdown.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_parse_folders() {
        let toml = r#"
[[folders]]
path = "/docs/"
sanitize_html = true
base_path = "/site/docs/"

[[folders]]
path = "/posts/"
url_mask = "/blog/"
view_template = "_post.html"
extract_title = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.folders,
            vec![
                FolderConfig {
                    path: "/docs/".to_owned(),
                    sanitize_html: true,
                    base_path: Some("/site/docs/".to_owned()),
                    ..FolderConfig::default()
                },
                FolderConfig {
                    path: "/posts/".to_owned(),
                    url_mask: Some("/blog/".to_owned()),
                    view_template: Some("_post.html".to_owned()),
                    extract_title: false,
                    ..FolderConfig::default()
                },
            ]
        );
    }

    #[test]
    fn test_parse_markdown_and_diagrams() {
        let toml = r#"
[markdown]
sanitize_tag_denylist = "script|style"
gfm = false
icons = false

[diagrams]
plantuml_server_url = "https://uml.example.com/svg/"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.markdown.sanitize_tag_denylist, "script|style");
        assert!(!config.markdown.gfm);
        assert!(config.markdown.heading_ids);
        assert!(!config.markdown.icons);
        assert_eq!(
            config.plantuml_server_url(),
            Some("https://uml.example.com/svg/")
        );
    }

    #[test]
    fn test_disabled_diagrams_have_no_server() {
        let config: Config = toml::from_str("[diagrams]\nenabled = false\n").unwrap();
        assert_eq!(config.plantuml_server_url(), None);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[site]
web_root = "public"
default_documents = ["index.md", "readme.md"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.site_resolved.web_root, PathBuf::from("/project/public"));
        assert_eq!(
            config.site_resolved.default_documents,
            vec!["index.md", "readme.md"]
        );
        assert_eq!(config.folders, vec![FolderConfig::default()]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[[folders]]\npath = \"/docs/\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site_resolved.web_root, dir.path().join("wwwroot"));
        assert_eq!(config.folders.len(), 1);
        assert_eq!(config.folders[0].path, "/docs/");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/mdweb.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(9000),
            web_root: Some(PathBuf::from("/srv/site")),
            plantuml_server_url: Some("https://uml.example.com/png/".to_owned()),
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.site_resolved.web_root, PathBuf::from("/srv/site"));
        assert_eq!(
            config.diagrams.plantuml_server_url,
            "https://uml.example.com/png/"
        );
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7979);
        assert_eq!(config.site_resolved.web_root, PathBuf::from("/test/wwwroot"));
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();

        let settings = CliSettings {
            plantuml_server_url: Some("ftp://uml".to_owned()),
            ..CliSettings::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: each test uses its own variable names
        unsafe {
            std::env::set_var("MDWEB_CFG_TEST_HOST", "0.0.0.0");
            std::env::set_var("MDWEB_CFG_TEST_BASE", "/mirror/");
        }
        let toml = r#"
[server]
host = "${MDWEB_CFG_TEST_HOST}"

[diagrams]
plantuml_server_url = "${MDWEB_CFG_TEST_UML:-https://uml.example.com/png/}"

[[folders]]
path = "/docs/"
base_path = "${MDWEB_CFG_TEST_BASE}docs/"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.diagrams.plantuml_server_url,
            "https://uml.example.com/png/"
        );
        assert_eq!(config.folders[0].base_path.as_deref(), Some("/mirror/docs/"));
        unsafe {
            std::env::remove_var("MDWEB_CFG_TEST_HOST");
            std::env::remove_var("MDWEB_CFG_TEST_BASE");
        }
    }

    #[test]
    fn test_expand_env_vars_missing() {
        // SAFETY: each test uses its own variable names
        unsafe {
            std::env::remove_var("MDWEB_CFG_TEST_MISSING");
        }
        let toml = "[[folders]]\npath = \"/\"\nbase_path = \"${MDWEB_CFG_TEST_MISSING}\"\n";
        let mut config: Config = toml::from_str(toml).unwrap();

        let err = config.expand_env_vars().unwrap_err();
        assert!(err.to_string().contains("folders[0].base_path"));
    }

    #[test]
    fn test_validate_server() {
        let mut config = Config::default();
        config.server.host = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("server.host"));

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_denylist() {
        let mut config = Config::default();
        config.markdown.sanitize_tag_denylist = "script|<b>".to_owned();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: markdown.sanitize_tag_denylist contains invalid tag name '<b>'"
        );

        config.markdown.sanitize_tag_denylist = String::new();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_fetch_timeout() {
        let mut config = Config::default();
        config.markdown.fetch_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_plantuml_url() {
        let mut config = Config::default();
        config.diagrams.plantuml_server_url = "uml.example.com".to_owned();
        assert!(config.validate().is_err());

        config.diagrams.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_folders() {
        let mut config = Config::default();
        config.folders.clear();
        assert!(config.validate().is_err());

        config.folders.push(FolderConfig {
            path: " ".to_owned(),
            ..FolderConfig::default()
        });
        assert!(config.validate().unwrap_err().to_string().contains("folders[0].path"));
    }
}
