//! Configuration management
//!
//! Loads configuration for the serptrack backend from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Credential encryption configuration
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// External provider endpoints
    #[serde(default)]
    pub providers: ProviderConfig,
    /// Rank-check scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin for the frontend
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/serptrack.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_session_ttl_days() -> i64 {
    30
}

/// Credential encryption configuration
///
/// The key is an arbitrary string; a 256-bit AES key is derived from it.
/// The default is only suitable for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default = "default_encryption_key")]
    pub key: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key: default_encryption_key(),
        }
    }
}

fn default_encryption_key() -> String {
    "serptrack-dev-key-change-me".to_string()
}

/// External provider endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub dataforseo: DataForSeoConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// DataForSEO endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataForSeoConfig {
    /// API base URL (override for testing against a mock server)
    #[serde(default = "default_dataforseo_base_url")]
    pub base_url: String,
}

impl Default for DataForSeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_dataforseo_base_url(),
        }
    }
}

fn default_dataforseo_base_url() -> String {
    "https://api.dataforseo.com/v3".to_string()
}

/// Anthropic endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API base URL (override for testing against a mock server)
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    /// Model used for analysis and chat
    #[serde(default = "default_anthropic_model")]
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
        }
    }
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

/// Rank-check scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the periodic rank-check job runs at all
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Hours between full rank-check sweeps
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// How many SERP results to request per check
    #[serde(default = "default_serp_depth")]
    pub serp_depth: u32,
    /// Maximum concurrent checks per sweep
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_hours: default_interval_hours(),
            serp_depth: default_serp_depth(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_interval_hours() -> u64 {
    24
}

fn default_serp_depth() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - SERPTRACK_SERVER_HOST / SERPTRACK_SERVER_PORT / SERPTRACK_SERVER_CORS_ORIGIN
    /// - SERPTRACK_DATABASE_DRIVER / SERPTRACK_DATABASE_URL
    /// - SERPTRACK_AUTH_SESSION_TTL_DAYS
    /// - SERPTRACK_ENCRYPTION_KEY
    /// - SERPTRACK_SCHEDULER_ENABLED / SERPTRACK_SCHEDULER_INTERVAL_HOURS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERPTRACK_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SERPTRACK_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SERPTRACK_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SERPTRACK_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SERPTRACK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("SERPTRACK_AUTH_SESSION_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.session_ttl_days = ttl;
            }
        }

        if let Ok(key) = std::env::var("SERPTRACK_ENCRYPTION_KEY") {
            self.encryption.key = key;
        }

        if let Ok(enabled) = std::env::var("SERPTRACK_SCHEDULER_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.scheduler.enabled = true,
                "false" | "0" | "no" => self.scheduler.enabled = false,
                _ => {}
            }
        }
        if let Ok(hours) = std::env::var("SERPTRACK_SCHEDULER_INTERVAL_HOURS") {
            if let Ok(hours) = hours.parse::<u64>() {
                self.scheduler.interval_hours = hours;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/serptrack.db");
        assert_eq!(config.auth.session_ttl_days, 30);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_hours, 24);
        assert_eq!(config.scheduler.serp_depth, 100);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("/nonexistent/config.yml"))
            .expect("Missing file should yield defaults");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "   \n").expect("Failed to write");
        let config = Config::load(file.path()).expect("Empty file should yield defaults");
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            "server:\n  port: 9000\ndatabase:\n  driver: mysql\n  url: mysql://root@localhost/serptrack\n"
        )
        .expect("Failed to write");

        let config = Config::load(file.path()).expect("Failed to load config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.scheduler.interval_hours, 24);
    }

    #[test]
    fn test_load_scheduler_section() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            "scheduler:\n  enabled: false\n  interval_hours: 6\n  serp_depth: 50\n  concurrency: 2\n"
        )
        .expect("Failed to write");

        let config = Config::load(file.path()).expect("Failed to load config");
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_hours, 6);
        assert_eq!(config.scheduler.serp_depth, 50);
        assert_eq!(config.scheduler.concurrency, 2);
    }

    #[test]
    fn test_load_invalid_yaml_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "server: [not: a: mapping\n").expect("Failed to write");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_provider_defaults() {
        let config = Config::default();
        assert_eq!(
            config.providers.dataforseo.base_url,
            "https://api.dataforseo.com/v3"
        );
        assert_eq!(
            config.providers.anthropic.base_url,
            "https://api.anthropic.com/v1"
        );
        assert!(config.providers.anthropic.model.starts_with("claude-"));
    }
}
