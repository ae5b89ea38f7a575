//! Configuration resolution for cid-analysis
//!
//! **[CID-CFG-010]** Two-tier resolution with ENV → TOML priority.
//!
//! The prediction service base URL has no compiled default: a hardcoded
//! fallback address is a configuration defect, so startup fails fast
//! when no URL is supplied.

use cid_common::config::TomlConfig;
use cid_common::{Error, Result};
use tracing::{info, warn};

/// Default listen address when none is configured
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5810";

/// Default signed-URL validity (matches the storage bucket policy)
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Prediction service base URL (mandatory, no default)
    pub prediction_api_url: String,
    /// Object storage settings
    pub storage: StorageConfig,
    /// SQLite history database path
    pub database_path: String,
    /// HTTP listen address
    pub bind_address: String,
}

/// Resolved object storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage API base URL (mandatory)
    pub base_url: String,
    /// Bucket for sample images
    pub bucket: String,
    /// Bearer token for uploads and signing
    pub service_key: String,
    /// Signed URL validity in seconds
    pub signed_url_ttl_secs: u64,
}

/// Resolve the full service configuration from ENV and TOML
pub fn resolve(toml_config: &TomlConfig) -> Result<ServiceConfig> {
    Ok(ServiceConfig {
        prediction_api_url: resolve_prediction_api_url(toml_config)?,
        storage: resolve_storage(toml_config)?,
        database_path: resolve_setting(
            "COLONYID_DATABASE_PATH",
            toml_config.database_path.as_deref(),
        )
        .unwrap_or_else(|| "colonyid.db".to_string()),
        bind_address: resolve_setting("COLONYID_BIND_ADDRESS", toml_config.bind_address.as_deref())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
    })
}

/// Resolve the prediction service base URL
///
/// **Priority:** ENV → TOML. Fails when neither source supplies a value.
pub fn resolve_prediction_api_url(toml_config: &TomlConfig) -> Result<String> {
    let env_url = std::env::var("COLONYID_PREDICTION_API_URL")
        .ok()
        .filter(|v| is_valid_value(v));
    let toml_url = toml_config
        .prediction_api_url
        .as_ref()
        .filter(|v| is_valid_value(v));

    if env_url.is_some() && toml_url.is_some() {
        warn!(
            "Prediction API URL found in both environment and TOML. \
             Using environment (highest priority)."
        );
    }

    if let Some(url) = env_url {
        info!("Prediction API URL loaded from environment variable");
        return Ok(normalize_base_url(&url));
    }

    if let Some(url) = toml_url {
        info!("Prediction API URL loaded from TOML config");
        return Ok(normalize_base_url(url));
    }

    Err(Error::Config(
        "Prediction API URL not configured. Please configure using one of:\n\
         1. Environment: COLONYID_PREDICTION_API_URL=http://host:port\n\
         2. TOML config: ~/.config/colonyid/colonyid.toml (prediction_api_url = \"http://host:port\")"
            .to_string(),
    ))
}

/// Resolve object storage settings
///
/// Base URL and service key are mandatory; bucket defaults to
/// "colony-images" and the signed-URL TTL to one hour.
fn resolve_storage(toml_config: &TomlConfig) -> Result<StorageConfig> {
    let toml_storage = toml_config.storage.as_ref();

    let base_url = resolve_setting(
        "COLONYID_STORAGE_URL",
        toml_storage.and_then(|s| s.base_url.as_deref()),
    )
    .ok_or_else(|| {
        Error::Config(
            "Object storage URL not configured. Set COLONYID_STORAGE_URL or \
             [storage] base_url in the TOML config."
                .to_string(),
        )
    })?;

    let service_key = resolve_setting(
        "COLONYID_STORAGE_KEY",
        toml_storage.and_then(|s| s.service_key.as_deref()),
    )
    .ok_or_else(|| {
        Error::Config(
            "Object storage service key not configured. Set COLONYID_STORAGE_KEY or \
             [storage] service_key in the TOML config."
                .to_string(),
        )
    })?;

    Ok(StorageConfig {
        base_url: normalize_base_url(&base_url),
        bucket: resolve_setting(
            "COLONYID_STORAGE_BUCKET",
            toml_storage.and_then(|s| s.bucket.as_deref()),
        )
        .unwrap_or_else(|| "colony-images".to_string()),
        service_key,
        signed_url_ttl_secs: toml_storage
            .and_then(|s| s.signed_url_ttl_secs)
            .unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS),
    })
}

/// Resolve one string setting with ENV → TOML priority
fn resolve_setting(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_value(&value) {
            return Some(value);
        }
    }
    toml_value
        .filter(|v| is_valid_value(v))
        .map(|v| v.to_string())
}

/// Validate a setting value (non-empty, non-whitespace)
fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Strip a trailing slash so endpoint joins are uniform
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid_common::config::StorageToml;

    fn toml_with_urls() -> TomlConfig {
        TomlConfig {
            prediction_api_url: Some("http://ml.example.com:5000/".to_string()),
            storage: Some(StorageToml {
                base_url: Some("https://xyz.supabase.co/storage/v1".to_string()),
                bucket: None,
                service_key: Some("secret".to_string()),
                signed_url_ttl_secs: None,
            }),
            database_path: None,
            bind_address: None,
            logging: Default::default(),
        }
    }

    #[test]
    fn test_missing_prediction_url_fails_fast() {
        // Env vars are process-global; use names no other test sets
        std::env::remove_var("COLONYID_PREDICTION_API_URL");
        let result = resolve_prediction_api_url(&TomlConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_url_resolves_and_normalizes() {
        std::env::remove_var("COLONYID_PREDICTION_API_URL");
        let url = resolve_prediction_api_url(&toml_with_urls()).unwrap();
        assert_eq!(url, "http://ml.example.com:5000");
    }

    #[test]
    fn test_storage_defaults() {
        std::env::remove_var("COLONYID_STORAGE_URL");
        std::env::remove_var("COLONYID_STORAGE_KEY");
        std::env::remove_var("COLONYID_STORAGE_BUCKET");
        let storage = resolve_storage(&toml_with_urls()).unwrap();
        assert_eq!(storage.bucket, "colony-images");
        assert_eq!(storage.signed_url_ttl_secs, 3600);
    }

    #[test]
    fn test_whitespace_value_is_invalid() {
        assert!(!is_valid_value("   "));
        assert!(is_valid_value("http://host"));
    }
}
