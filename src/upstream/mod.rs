//! Outbound HTTP clients
//!
//! - `chat`: streaming chat assistant proxy
//! - `translate`: MyMemory translation (en ↔ hi)
//! - `weather`: OpenWeather current conditions
//! - `soil`: SoilGrids nitrogen / pH
//!
//! Every client shares one `reqwest::Client` (connection pool, connect
//! timeout) and bounds each call by the configured upstream timeout.

pub mod chat;
pub mod soil;
pub mod translate;
pub mod weather;

pub use chat::{ChatClient, ChatStream};
pub use soil::{SoilClient, SoilReading};
pub use translate::{resolve_pair, TranslateClient};
pub use weather::{WeatherClient, WeatherReading};

use crate::config::AppConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("crop-advisor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("upstream rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Api(String),
}

pub fn build_http_client(connect_timeout: Duration) -> Result<Client, UpstreamError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .build()?)
}

/// All outbound clients, built once at startup
///
/// Chat and weather are optional: they need a URL or API key that has no
/// public default.
#[derive(Clone)]
pub struct UpstreamClients {
    pub chat: Option<ChatClient>,
    pub translate: TranslateClient,
    pub weather: Option<WeatherClient>,
    pub soil: SoilClient,
}

impl UpstreamClients {
    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let timeout = config.upstream_timeout();
        let http = build_http_client(timeout)?;

        let chat = config
            .chat_url
            .as_ref()
            .map(|url| ChatClient::new(http.clone(), url, config.chat_api_key.clone(), timeout));
        if chat.is_none() {
            tracing::warn!("CHAT_URL not set; /chat will be unavailable");
        }

        let weather = config
            .openweather_api_key
            .as_ref()
            .map(|key| WeatherClient::new(http.clone(), &config.openweather_url, key, timeout));
        if weather.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set; /weather will be unavailable");
        }

        Ok(Self {
            chat,
            translate: TranslateClient::new(http.clone(), &config.translate_url, timeout),
            weather,
            soil: SoilClient::new(http, &config.soilgrids_url, timeout),
        })
    }
}
