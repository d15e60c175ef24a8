//! MyMemory translation
//!
//! Only English ↔ Hindi is offered. `auto` as a source is treated as
//! English.

use super::UpstreamError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Normalised (source, target) pair, or `None` when unsupported
pub fn resolve_pair(source: &str, target: &str) -> Option<(&'static str, &'static str)> {
    match (source, target) {
        ("en", "hi") | ("auto", "hi") => Some(("en", "hi")),
        ("hi", "en") => Some(("hi", "en")),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    /// 200 on success; MyMemory sends it as a number or a string
    #[serde(rename = "responseStatus")]
    response_status: serde_json::Value,
    #[serde(rename = "responseData", default)]
    response_data: Option<MyMemoryData>,
    #[serde(rename = "responseDetails", default)]
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryResponse {
    fn is_ok(&self) -> bool {
        match &self.response_status {
            serde_json::Value::Number(n) => n.as_i64() == Some(200),
            serde_json::Value::String(s) => s.trim() == "200",
            _ => false,
        }
    }

    /// Translated text, falling back to the input
    fn into_text(self, original: &str) -> Result<String, UpstreamError> {
        if !self.is_ok() {
            return Err(UpstreamError::Rejected(
                self.response_details
                    .unwrap_or_else(|| format!("status {}", self.response_status)),
            ));
        }
        Ok(self
            .response_data
            .and_then(|d| d.translated_text)
            .unwrap_or_else(|| original.to_string()))
    }
}

#[derive(Clone)]
pub struct TranslateClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl TranslateClient {
    pub fn new(http: Client, url: &str, timeout: Duration) -> Self {
        Self {
            http,
            url: url.to_string(),
            timeout,
        }
    }

    pub async fn translate(&self, text: &str, pair: (&str, &str)) -> Result<String, UpstreamError> {
        let langpair = format!("{}|{}", pair.0, pair.1);
        tracing::debug!("Translating {} chars ({})", text.len(), langpair);

        let response: MyMemoryResponse = self
            .http
            .get(&self.url)
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_text(text)
    }
}
