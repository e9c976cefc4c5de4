//! Configuration file management
//!
//! TOML configuration read from `~/.observable/config.toml`. Every section
//! and field is optional; command-line flags override what is set here.
//!
//! # Configuration Format
//!
//! ```toml
//! [server]
//! url = "http://localhost:5000"  # Base URL, http(s) or ws(s)
//!
//! [connection]
//! auto_reconnect = true          # Reconnect after a lost or failed socket
//! reconnect_delay_ms = 500       # Wait before the first reconnect
//! reconnect_step_ms = 500        # Added per attempt: delay += step * attempt
//! max_reconnect_attempts = 100   # 0 = unlimited
//!
//! [timeouts]
//! connection_timeout_secs = 10
//! keepalive_interval_secs = 10   # 0 disables keepalive pings
//! pong_timeout_secs = 5
//!
//! [logging]
//! level = "info"
//! format = "compact"             # compact, json
//! ```

use observable_link::{ConnectionOptions, LinkTimeouts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CLIError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "~/.observable/config.toml";

/// CLI configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CLIConfiguration {
    pub server: Option<ServerConfig>,

    /// Reconnection policy
    pub connection: Option<ConnectionConfig>,

    pub timeouts: Option<TimeoutsConfig>,

    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL (e.g., http://localhost:5000)
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_reconnect_step_ms")]
    pub reconnect_step_ms: u64,

    /// Maximum number of reconnection attempts (0 = unlimited)
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// compact or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    500
}

fn default_reconnect_step_ms() -> u64 {
    500
}

fn default_max_reconnect_attempts() -> u32 {
    100
}

fn default_connection_timeout_secs() -> u64 {
    10
}

fn default_keepalive_interval_secs() -> u64 {
    10
}

fn default_pong_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_step_ms: default_reconnect_step_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    let path_str = path.to_str().unwrap_or(DEFAULT_CONFIG_PATH);
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new(DEFAULT_CONFIG_PATH))
}

impl CLIConfiguration {
    /// Load configuration from file
    ///
    /// Returns default configuration if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CLIError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        let config: CLIConfiguration = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CLIError::ConfigurationError(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server.as_ref().and_then(|s| s.url.as_deref())
    }

    /// Build ConnectionOptions from the `[connection]` section
    pub fn to_connection_options(&self) -> ConnectionOptions {
        let conn = self.resolved_connection();

        // 0 means unlimited
        let max_attempts = if conn.max_reconnect_attempts == 0 {
            None
        } else {
            Some(conn.max_reconnect_attempts)
        };

        ConnectionOptions::default()
            .with_auto_reconnect(conn.auto_reconnect)
            .with_reconnect_delay_ms(conn.reconnect_delay_ms)
            .with_reconnect_step_ms(conn.reconnect_step_ms)
            .with_max_reconnect_attempts(max_attempts)
    }

    /// Build LinkTimeouts from the `[timeouts]` section
    pub fn to_timeouts(&self) -> LinkTimeouts {
        let timeouts = self.timeouts.clone().unwrap_or_default();
        LinkTimeouts::builder()
            .connection_timeout_secs(timeouts.connection_timeout_secs)
            .keepalive_interval_secs(timeouts.keepalive_interval_secs)
            .pong_timeout_secs(timeouts.pong_timeout_secs)
            .build()
    }

    pub fn resolved_connection(&self) -> ConnectionConfig {
        self.connection.clone().unwrap_or_default()
    }

    pub fn resolved_logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CLIConfiguration::load(&dir.path().join("absent.toml")).unwrap();

        assert!(config.server_url().is_none());
        let options = config.to_connection_options();
        assert!(options.auto_reconnect);
        assert_eq!(options.reconnect_delay_ms, 500);
        assert_eq!(options.reconnect_step_ms, 500);
        assert_eq!(options.max_reconnect_attempts, Some(100));
        assert_eq!(config.resolved_logging().level, "info");
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
url = "https://api.example.com"

[connection]
auto_reconnect = false
max_reconnect_attempts = 0

[timeouts]
keepalive_interval_secs = 0
"#,
        )
        .unwrap();

        let config = CLIConfiguration::load(&path).unwrap();
        assert_eq!(config.server_url(), Some("https://api.example.com"));

        let options = config.to_connection_options();
        assert!(!options.auto_reconnect);
        assert_eq!(options.reconnect_delay_ms, 500);
        assert_eq!(options.max_reconnect_attempts, None);

        let timeouts = config.to_timeouts();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.keepalive_interval, Duration::ZERO);
        assert_eq!(timeouts.pong_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = CLIConfiguration {
            server: Some(ServerConfig {
                url: Some("http://localhost:5000".into()),
            }),
            logging: Some(LoggingConfig {
                level: "debug".into(),
                format: "json".into(),
            }),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[server]"));
        assert!(contents.contains("[logging]"));

        let loaded = CLIConfiguration::load(&path).unwrap();
        assert_eq!(loaded.server_url(), Some("http://localhost:5000"));
        assert_eq!(loaded.resolved_logging().format, "json");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connection\nauto_reconnect = ").unwrap();

        let err = CLIConfiguration::load(&path).unwrap_err();
        assert!(matches!(err, CLIError::ConfigurationError(_)));
        assert!(err.to_string().starts_with("Configuration error: TOML parse error"));
    }

    #[test]
    fn test_expand_home_path() {
        let expanded = default_config_path();
        assert!(expanded.ends_with(".observable/config.toml"));
    }
}
