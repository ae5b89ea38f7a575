//! Configuration loading for ColonyID services
//!
//! TOML file discovery and parsing. Resolution priority (environment
//! variables over TOML values) is applied by each service's own
//! `config` module; this file only knows how to find and read the file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents
///
/// All fields are optional: the file may be absent entirely, and each
/// service decides which settings are mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the ML prediction service (no compiled default)
    pub prediction_api_url: Option<String>,

    /// Object storage settings for sample image uploads
    pub storage: Option<StorageToml>,

    /// Path to the SQLite history database
    pub database_path: Option<String>,

    /// Listen address for the HTTP API (host:port)
    pub bind_address: Option<String>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Object storage section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageToml {
    /// Storage API base URL (e.g. https://xyz.supabase.co/storage/v1)
    pub base_url: Option<String>,
    /// Bucket for sample images
    pub bucket: Option<String>,
    /// Service key used as bearer token for uploads
    pub service_key: Option<String>,
    /// Signed URL validity in seconds
    pub signed_url_ttl_secs: Option<u64>,
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Locate the configuration file for the platform
///
/// Linux: `~/.config/colonyid/colonyid.toml`, then `/etc/colonyid/colonyid.toml`.
/// macOS/Windows: the OS config directory, `colonyid/colonyid.toml`.
/// Returns the first existing path, or NotFound when no file exists.
pub fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("colonyid").join("colonyid.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/colonyid/colonyid.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::NotFound("No config file found".to_string()))
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load the configuration file if one exists, else defaults
///
/// A missing file is not an error (services fall back to environment
/// variables); a present-but-malformed file is.
pub fn load_or_default() -> Result<TomlConfig> {
    match config_file_path() {
        Ok(path) => {
            tracing::info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        Err(_) => Ok(TomlConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
prediction_api_url = "http://ml.example.com:5000"
database_path = "/var/lib/colonyid/colonyid.db"
bind_address = "127.0.0.1:5810"

[storage]
base_url = "https://xyz.supabase.co/storage/v1"
bucket = "colony-images"
service_key = "secret"
signed_url_ttl_secs = 3600

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = load_toml_config(file.path()).unwrap();
        assert_eq!(
            config.prediction_api_url.as_deref(),
            Some("http://ml.example.com:5000")
        );
        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket.as_deref(), Some("colony-images"));
        assert_eq!(storage.signed_url_ttl_secs, Some(3600));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = load_toml_config(file.path()).unwrap();
        assert!(config.prediction_api_url.is_none());
        assert!(config.storage.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_config_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prediction_api_url = [not toml").unwrap();
        assert!(load_toml_config(file.path()).is_err());
    }
}
