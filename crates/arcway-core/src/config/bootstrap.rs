//! Process bootstrap configuration, distinct from the admin-managed
//! endpoints/routes/transformers served through the [`super::store`]
//! Config Store.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientSettings {
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            max_idle_per_host: default_max_idle_per_host(),
            idle_timeout_seconds: default_idle_timeout_seconds(),
        }
    }
}

fn default_max_idle_per_host() -> usize {
    100
}

fn default_idle_timeout_seconds() -> u64 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,
    #[serde(default)]
    pub http_client: HttpClientSettings,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            log_retention_days: default_log_retention_days(),
            http_client: HttpClientSettings::default(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_version() -> String {
    "1".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_log_retention_days() -> u32 {
    30
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Settings {
    /// Structural validation that must hold before the process starts
    /// serving; separate from the entity-level [`super::validation::ConfigValidator`]
    /// which inspects the routed configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_port == 0 {
            return Err("bind_port must be nonzero".to_string());
        }
        if self.default_timeout_ms == 0 {
            return Err("default_timeout_ms must be nonzero".to_string());
        }
        Ok(())
    }
}

const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;

/// Loads bootstrap settings from a JSON file on disk.
///
/// The path is taken from `ARCWAY_CONFIG_PATH`, falling back to
/// `./config.json`. The path is canonicalized and must resolve inside the
/// current working directory, and the file is capped at 10MB, mirroring the
/// gateway's existing config-loading hardening.
pub fn load_settings() -> Result<Settings, Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("ARCWAY_CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_string());

    debug!("Loading configuration from: {}", config_path);

    let path = Path::new(&config_path);
    if !path.exists() {
        debug!("No config file at '{}', using defaults", config_path);
        return Ok(Settings::default());
    }

    let canonical_path = path
        .canonicalize()
        .map_err(|e| format!("Cannot resolve config path '{}': {}", config_path, e))?;

    let current_dir =
        std::env::current_dir().map_err(|e| format!("Cannot get current directory: {}", e))?;

    if !canonical_path.starts_with(&current_dir) {
        warn!("Config path '{}' is outside working directory", config_path);
        return Err("Config path outside working directory".into());
    }

    let metadata = fs::metadata(&canonical_path)
        .map_err(|e| format!("Cannot read config file metadata: {}", e))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(format!(
            "Config file too large: {} bytes (max: {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        )
        .into());
    }

    let config_data = fs::read_to_string(&canonical_path)
        .map_err(|e| format!("Cannot read config file: {}", e))?;

    let settings: Settings =
        serde_json::from_str(&config_data).map_err(|e| format!("Invalid JSON: {}", e))?;

    debug!("Successfully loaded bootstrap settings, version {}", settings.version);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_port() {
        let mut settings = Settings::default();
        settings.bind_port = 0;
        assert!(settings.validate().is_err());
    }
}
