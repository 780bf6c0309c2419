//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ENCORE_*)
//! 2. TOML config file (if ENCORE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ENCORE_*)
/// 2. TOML config file (if ENCORE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is registered for; relative asset paths resolve
    /// against it.
    ///
    /// Set via ENCORE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Static asset set pre-populated at install time.
    ///
    /// Must include the app shell (`/`).
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path to the SQLite database holding cache generations and songs.
    ///
    /// Set via ENCORE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ENCORE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via ENCORE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via ENCORE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts at pre-populating the static asset set during install.
    ///
    /// Set via ENCORE_INSTALL_RETRIES environment variable.
    #[serde(default)]
    pub install_retries: u32,

    /// Whether notification permission requests are granted.
    ///
    /// Set via ENCORE_NOTIFICATIONS_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_static_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./encore.sqlite")
}

fn default_user_agent() -> String {
    "encore/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            static_assets: default_static_assets(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            install_retries: 0,
            notifications_enabled: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ENCORE_`
    /// 2. TOML file from `ENCORE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ENCORE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ENCORE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:8080/");
        assert_eq!(config.static_assets, vec!["/", "/index.html", "/manifest.json"]);
        assert_eq!(config.db_path, PathBuf::from("./encore.sqlite"));
        assert_eq!(config.user_agent, "encore/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.install_retries, 0);
        assert!(config.notifications_enabled);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_toml_layer() {
        let toml = r#"
            origin = "https://playlist.example/"
            static_assets = ["/", "/index.html"]
            install_retries = 2
        "#;
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.origin, "https://playlist.example/");
        assert_eq!(config.static_assets, vec!["/", "/index.html"]);
        assert_eq!(config.install_retries, 2);
        assert_eq!(config.user_agent, "encore/0.1");
    }
}
