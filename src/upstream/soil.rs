//! SoilGrids topsoil nitrogen and pH

use super::UpstreamError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Soil inputs for the crop classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    #[serde(rename = "N")]
    pub n: f64,
    pub ph: f64,
}

/// Mean of the first reported depth for one property layer
fn layer_mean(body: &Value, property: &str) -> Option<f64> {
    body.pointer("/properties/layers")?
        .as_array()?
        .iter()
        .find(|layer| layer.get("name").and_then(Value::as_str) == Some(property))?
        .get("depths")?
        .get(0)?
        .pointer("/values/mean")?
        .as_f64()
}

/// Extract nitrogen and pH from a SoilGrids properties response
///
/// SoilGrids reports pH ×10, so `phh2o` is scaled back down.
pub fn parse_soilgrids(body: &Value) -> Result<SoilReading, UpstreamError> {
    let n = layer_mean(body, "nitrogen")
        .ok_or_else(|| UpstreamError::Api("no nitrogen value for this location".to_string()))?;
    let ph = layer_mean(body, "phh2o")
        .ok_or_else(|| UpstreamError::Api("no phh2o value for this location".to_string()))?;
    Ok(SoilReading { n, ph: ph / 10.0 })
}

#[derive(Clone)]
pub struct SoilClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl SoilClient {
    pub fn new(http: Client, url: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: url.to_string(),
            timeout,
        }
    }

    pub async fn topsoil(&self, lat: f64, lon: f64) -> Result<SoilReading, UpstreamError> {
        let lat = lat.clamp(-90.0, 90.0);
        let lon = lon.clamp(-180.0, 180.0);

        let body: Value = self
            .http
            .get(&self.url)
            .query(&[
                ("lon", lon.to_string()),
                ("lat", lat.to_string()),
                ("property", "nitrogen".to_string()),
                ("property", "phh2o".to_string()),
                ("depth", "0-5cm".to_string()),
                ("value", "mean".to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_soilgrids(&body)
    }
}
