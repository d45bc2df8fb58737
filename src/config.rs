use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the root directory when `--base-dir` is absent
pub const BASE_DIR_ENV: &str = "REPOS_BASE_DIR";

/// Root used when nothing else is configured
pub const DEFAULT_BASE_DIR: &str = "~/code";

/// Main configuration structure for git-cloner
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Root directory for cloned repositories
    #[serde(default)]
    pub base_directory: Option<String>,

    /// Hosting API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Version-control subprocess settings
    #[serde(default)]
    pub git: GitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub API configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Host name that URLs must carry for bulk enumeration
    #[serde(default = "default_github_host")]
    pub host: String,

    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Repositories requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Seconds to wait after a rate-limit response before retrying the page
    #[serde(default = "default_rate_limit_cooldown")]
    pub rate_limit_cooldown: u64,

    /// Milliseconds to wait between successful page fetches
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-request timeout in seconds (0 disables)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Environment variable holding an optional API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Git subprocess configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// Executable to invoke
    #[serde(default = "default_git_binary")]
    pub binary: String,

    /// Timeout for each git operation in seconds (0 disables)
    #[serde(default)]
    pub timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_github_host() -> String {
    "github.com".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_rate_limit_cooldown() -> u64 {
    60
}
fn default_page_delay_ms() -> u64 {
    100
}
fn default_request_timeout() -> u64 {
    30
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// Default implementations
impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            host: default_github_host(),
            api_url: default_api_url(),
            per_page: default_per_page(),
            rate_limit_cooldown: default_rate_limit_cooldown(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout: default_request_timeout(),
            token_env: default_token_env(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            timeout: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GitHubConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        optional_secs(self.request_timeout)
    }

    /// Token from the ambient environment, if any
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Option<Duration> {
        optional_secs(self.timeout)
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("git-cloner").join("config.yml"))
    }

    /// Pick the root directory: CLI flag, then environment, then config file, then `~/code`.
    ///
    /// The result is expanded, made absolute and lexically cleaned, but not created.
    pub fn resolve_base_dir(&self, cli_base_dir: Option<&str>) -> Result<PathBuf> {
        let env_base_dir = std::env::var(BASE_DIR_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());

        let raw = cli_base_dir
            .map(str::to_string)
            .or(env_base_dir)
            .or_else(|| self.base_directory.clone())
            .unwrap_or_else(|| DEFAULT_BASE_DIR.to_string());

        crate::paths::absolutize(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.base_directory.is_none());
        assert_eq!(config.github.host, "github.com");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.github.cooldown(), Duration::from_secs(60));
        assert_eq!(config.github.page_delay(), Duration::from_millis(100));
        assert_eq!(config.github.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.git.binary, "git");
        assert!(config.git.timeout().is_none());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/config.yml");
        let result = Config::load(nonexistent_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.yml");

        let mut config = Config::default();
        config.base_directory = Some("/custom/path".to_string());
        config.github.per_page = 50;
        config.git.timeout = 600;

        config.save(&config_path).expect("Failed to save config");
        let loaded = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded.base_directory.as_deref(), Some("/custom/path"));
        assert_eq!(loaded.github.per_page, 50);
        assert_eq!(loaded.git.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains("git-cloner"));
        assert!(default_path.to_string_lossy().ends_with("config.yml"));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
base_directory: "${HOME}/mirrors"
github:
  api_url: "http://localhost:9999"
  per_page: 30
  rate_limit_cooldown: 5
  page_delay_ms: 0
  request_timeout: 0
git:
  binary: "/usr/local/bin/git"
  timeout: 120
logging:
  level: "debug"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.base_directory.as_deref(), Some("${HOME}/mirrors"));
        assert_eq!(config.github.host, "github.com");
        assert_eq!(config.github.api_url, "http://localhost:9999");
        assert_eq!(config.github.per_page, 30);
        assert_eq!(config.github.cooldown(), Duration::from_secs(5));
        assert_eq!(config.github.page_delay(), Duration::ZERO);
        assert!(config.github.request_timeout().is_none());
        assert_eq!(config.git.binary, "/usr/local/bin/git");
        assert_eq!(config.git.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_resolve_base_dir_priority() {
        // Single test so the env var is not raced by parallel tests
        let config = Config {
            base_directory: Some("/from/config".to_string()),
            ..Default::default()
        };

        env::set_var(BASE_DIR_ENV, "/from/env");
        assert_eq!(
            config.resolve_base_dir(Some("/from/cli")).unwrap(),
            PathBuf::from("/from/cli")
        );
        assert_eq!(
            config.resolve_base_dir(None).unwrap(),
            PathBuf::from("/from/env")
        );

        env::remove_var(BASE_DIR_ENV);
        assert_eq!(
            config.resolve_base_dir(None).unwrap(),
            PathBuf::from("/from/config")
        );

        let default_root = Config::default().resolve_base_dir(None).unwrap();
        assert!(default_root.is_absolute());
        assert!(default_root.ends_with("code"));
    }
}
