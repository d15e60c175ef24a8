//! Runtime configuration
//!
//! Layered with figment, later layers winning:
//! 1. built-in defaults
//! 2. `crop_advisor.toml` in the working directory (optional)
//! 3. environment variables (a `.env` file is loaded first via dotenvy)
//!
//! Environment keys are the upper-case field names (`PORT`, `MODEL_DIR`,
//! `CHAT_URL`, ...). `BACKEND_PORT` is accepted as a fallback for `PORT`.
//! Text-valued keys are taken verbatim, so an all-digit API key stays a
//! string.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILE: &str = "crop_advisor.toml";

/// Keys parsed as TOML-like scalars (numbers, booleans)
const TYPED_ENV_KEYS: &[&str] = &["PORT", "DEBUG", "UPSTREAM_TIMEOUT_SECS"];

/// Keys passed through as raw strings
const TEXT_ENV_KEYS: &[&str] = &[
    "HOST",
    "CORS_ORIGINS",
    "MODEL_DIR",
    "CLASSIFIER_PATH",
    "LABEL_ENCODER_PATH",
    "PRICE_MODEL_PATH",
    "PRICE_DATA_PATH",
    "CHAT_URL",
    "CHAT_API_KEY",
    "TRANSLATE_URL",
    "OPENWEATHER_URL",
    "OPENWEATHER_API_KEY",
    "SOILGRIDS_URL",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// Comma-separated allowed origins, `*` for any
    pub cors_origins: String,

    /// Directory holding model artifacts and price history
    pub model_dir: String,
    pub classifier_path: Option<String>,
    pub label_encoder_path: Option<String>,
    pub price_model_path: Option<String>,
    pub price_data_path: Option<String>,

    pub chat_url: Option<String>,
    pub chat_api_key: Option<String>,
    pub translate_url: String,
    pub openweather_url: String,
    pub openweather_api_key: Option<String>,
    pub soilgrids_url: String,
    pub upstream_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            debug: false,
            cors_origins: "http://localhost:8080,http://127.0.0.1:8080".to_string(),
            model_dir: "models".to_string(),
            classifier_path: None,
            label_encoder_path: None,
            price_model_path: None,
            price_data_path: None,
            chat_url: None,
            chat_api_key: None,
            translate_url: "https://api.mymemory.translated.net/get".to_string(),
            openweather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            openweather_api_key: None,
            soilgrids_url: "https://rest.isric.org/soilgrids/v2.0/properties/query".to_string(),
            upstream_timeout_secs: 20,
        }
    }
}

impl AppConfig {
    /// Load `.env`, then merge defaults, the config file and the environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(&["BACKEND_PORT"]).map(|_| "port".into()))
            .merge(Env::raw().only(TYPED_ENV_KEYS))
            .merge(Serialized::defaults(Self::text_env()))
    }

    fn text_env() -> BTreeMap<String, String> {
        Env::raw()
            .only(TEXT_ENV_KEYS)
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect()
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("Invalid configuration")
    }

    /// Allowed CORS origins, `None` when any origin is allowed
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    fn in_model_dir(&self, explicit: &Option<String>, file_name: &str) -> PathBuf {
        match explicit {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.model_dir).join(file_name),
        }
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.in_model_dir(&self.classifier_path, "crop_model.json")
    }

    pub fn label_encoder_path(&self) -> PathBuf {
        self.in_model_dir(&self.label_encoder_path, "label_encoder.json")
    }

    pub fn price_model_path(&self) -> PathBuf {
        self.in_model_dir(&self.price_model_path, "price_model.json")
    }

    pub fn price_data_path(&self) -> PathBuf {
        self.in_model_dir(&self.price_data_path, "price_history.csv")
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> String {
        let level = if self.debug { "debug" } else { "info" };
        format!("crop_advisor={},tower_http=debug,axum=debug,warn", level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> AppConfig {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml));
        AppConfig::from_figment(figment).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("");
        assert_eq!(config.port, 5001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.classifier_path(), PathBuf::from("models/crop_model.json"));
        assert_eq!(config.price_data_path(), PathBuf::from("models/price_history.csv"));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(20));
        assert!(config.chat_url.is_none());
    }

    #[test]
    fn test_overrides_and_explicit_paths() {
        let config = from_toml(
            r#"
            port = 8000
            debug = true
            model_dir = "/srv/models"
            price_data_path = "/data/prices.parquet"
            "#,
        );
        assert_eq!(config.port, 8000);
        assert_eq!(config.label_encoder_path(), PathBuf::from("/srv/models/label_encoder.json"));
        assert_eq!(config.price_data_path(), PathBuf::from("/data/prices.parquet"));
        assert_eq!(config.default_log_filter(), "crop_advisor=debug,tower_http=debug,axum=debug,warn");
    }

    #[test]
    fn test_cors_origin_list() {
        let config = from_toml(r#"cors_origins = " https://a.example , ,https://b.example""#);
        assert_eq!(
            config.cors_origin_list(),
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );

        let config = from_toml(r#"cors_origins = "https://a.example,*""#);
        assert_eq!(config.cors_origin_list(), None);
    }

    #[test]
    fn test_env_text_values_are_kept_verbatim() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CHAT_API_KEY", "123456");
            jail.set_env("OPENWEATHER_API_KEY", "0042");
            jail.set_env("CORS_ORIGINS", "true");
            jail.set_env("PORT", "8000");
            jail.set_env("UPSTREAM_TIMEOUT_SECS", "3");

            let config = AppConfig::from_figment(AppConfig::figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.chat_api_key.as_deref(), Some("123456"));
            assert_eq!(config.openweather_api_key.as_deref(), Some("0042"));
            assert_eq!(config.cors_origins, "true");
            assert_eq!(config.port, 8000);
            assert_eq!(config.upstream_timeout(), Duration::from_secs(3));
            Ok(())
        });
    }

    #[test]
    fn test_backend_port_fallback() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BACKEND_PORT", "7000");
            let config = AppConfig::from_figment(AppConfig::figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.port, 7000);
            Ok(())
        });
    }

    #[test]
    fn test_bad_value_is_an_error() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("port = \"abc\""));
        assert!(AppConfig::from_figment(figment).is_err());
    }
}
