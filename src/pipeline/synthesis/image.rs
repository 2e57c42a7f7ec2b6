use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use super::types::ImageSynthesis;
use super::ImageError;

/// MIME type declared on every illustration data URI.
pub const IMAGE_MIME: &str = "image/png";

/// Encode raw image bytes as an inline `data:` URI.
pub fn to_data_uri(bytes: &[u8]) -> String {
    format!("data:{IMAGE_MIME};base64,{}", BASE64.encode(bytes))
}

/// Client for a Hugging Face text-to-image inference endpoint.
pub struct HfImageClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ImageRequestBody<'a> {
    inputs: &'a str,
}

impl HfImageClient {
    pub fn new(endpoint: &str, token: &str, timeout_secs: u64) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ImageError::Connection(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            timeout_secs,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ImageError {
        if e.is_timeout() {
            ImageError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ImageError::Connection(self.endpoint.clone())
        } else {
            ImageError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl ImageSynthesis for HfImageClient {
    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&ImageRequestBody { inputs: prompt })
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        if bytes.is_empty() {
            return Err(ImageError::EmptyPayload);
        }
        Ok(bytes.to_vec())
    }
}

/// Mock image service for testing.
pub struct MockImageSynthesis {
    outcome: Result<Vec<u8>, ImageError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockImageSynthesis {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            outcome: Ok(bytes.to_vec()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ImageError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageSynthesis for MockImageSynthesis {
    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
