//! Chat assistant proxy
//!
//! The upstream answers `POST {prompt}` with a streamed plain-text body,
//! which is handed back chunk by chunk. Waiting for the response head and
//! waiting for each further chunk are both bounded by the timeout, so a
//! stalled upstream ends the stream with an error instead of hanging.

use super::UpstreamError;
use axum::body::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;

pub type ChatStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(http: Client, url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.to_string(),
            api_key,
            timeout,
        }
    }

    pub async fn stream(&self, prompt: &str) -> Result<ChatStream, UpstreamError> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??
            .error_for_status()?;

        let idle = self.timeout;
        let body = Box::pin(response.bytes_stream());

        Ok(stream::unfold(Some(body), move |state| async move {
            let mut body = state?;
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
                Ok(Some(Err(e))) => Some((Err(UpstreamError::Http(e)), None)),
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!("Chat upstream idle for {:?}; closing stream", idle);
                    Some((Err(UpstreamError::Timeout(idle)), None))
                }
            }
        })
        .boxed())
    }
}
