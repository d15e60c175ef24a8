//! OpenWeather current conditions

use super::UpstreamError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weather inputs for the crop classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// mm over the last 1h (or 3h) window, 0 when it did not rain
    pub rainfall: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    main: OpenWeatherMain,
    #[serde(default)]
    rain: Option<OpenWeatherRain>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

impl From<OpenWeatherResponse> for WeatherReading {
    fn from(r: OpenWeatherResponse) -> Self {
        let rainfall = r
            .rain
            .and_then(|rain| rain.one_hour.or(rain.three_hours))
            .unwrap_or(0.0);
        Self {
            temperature: r.main.temp,
            humidity: r.main.humidity,
            rainfall,
        }
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(http: Client, url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    pub async fn current(&self, lat: f64, lon: f64) -> Result<WeatherReading, UpstreamError> {
        let response: OpenWeatherResponse = self
            .http
            .get(&self.url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into())
    }
}
