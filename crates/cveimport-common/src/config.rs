//! Configuration for the cveimport binary

use std::path::Path;

use cveimport_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server connection settings
    #[serde(default)]
    pub gmp: GmpConfig,

    /// Lookup-table settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {}", e)))
    }

    /// Merge with environment variables (CVEIMPORT_ prefix)
    pub fn merge_env(mut self) -> Self {
        if let Ok(val) = std::env::var("CVEIMPORT_SOCKET") {
            self.gmp.socket_path = val;
        }
        if let Ok(val) = std::env::var("CVEIMPORT_GMP_USERNAME") {
            self.gmp.username = Some(val);
        }
        if let Ok(val) = std::env::var("CVEIMPORT_GMP_PASSWORD") {
            self.gmp.password = Some(val);
        }
        if let Ok(val) = std::env::var("CVEIMPORT_LIST") {
            self.catalog.list_path = val;
        }
        if let Ok(val) = std::env::var("CVEIMPORT_PAGE_SIZE") {
            if let Ok(n) = val.parse() {
                self.catalog.page_size = n;
            }
        }
        if let Ok(val) = std::env::var("CVEIMPORT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("CVEIMPORT_LOG_FORMAT") {
            self.logging.format = val;
        }
        self
    }
}

/// Server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmpConfig {
    /// gvmd Unix socket path
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// GMP username; authentication is skipped when unset
    pub username: Option<String>,

    /// GMP password
    pub password: Option<String>,

    /// Response read timeout in seconds (0 = no timeout)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
}

fn default_socket_path() -> String {
    String::from("/run/gvmd/gvmd.sock")
}

fn default_read_timeout() -> u64 {
    300
}

impl Default for GmpConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            username: None,
            password: None,
            read_timeout_seconds: default_read_timeout(),
        }
    }
}

/// Lookup-table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path of the CPE to CVE lookup list
    #[serde(default = "default_list_path")]
    pub list_path: String,

    /// CVE feed page size when creating the list
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_list_path() -> String {
    String::from("cpes.csv")
}

fn default_page_size() -> u64 {
    1000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_path: default_list_path(),
            page_size: default_page_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("compact")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gmp.socket_path, "/run/gvmd/gvmd.sock");
        assert_eq!(config.catalog.list_path, "cpes.csv");
        assert_eq!(config.catalog.page_size, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [gmp]
            socket_path = "/tmp/gvmd.sock"
            username = "admin"
            password = "secret"

            [catalog]
            list_path = "/var/lib/cveimport/cpes.csv"
            page_size = 500

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.gmp.socket_path, "/tmp/gvmd.sock");
        assert_eq!(config.gmp.username.as_deref(), Some("admin"));
        assert_eq!(config.catalog.page_size, 500);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("[gmp]\nsocket_path = \"/tmp/g.sock\"\n").unwrap();
        assert_eq!(config.gmp.socket_path, "/tmp/g.sock");
        assert_eq!(config.gmp.read_timeout_seconds, 300);
        assert_eq!(config.catalog.page_size, 1000);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        assert!(matches!(
            Config::from_toml("not = [valid"),
            Err(Error::Configuration(_))
        ));
    }
}
