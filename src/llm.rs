//! External generation capability.
//!
//! The orchestrator only depends on the `Generator` trait; the shipped
//! implementation talks to a generative-language REST endpoint. One attempt
//! per request, no automatic retry; the timeout is a configuration knob and
//! absent by default.

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::GenerationError;

/// The single capability the pipeline expects from a model backend.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// REST client for the generative-language API
/// (`models/{model}:generateContent`).
pub struct HttpGenerator {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(cfg: &LlmConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = cfg.timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(ms));
        }
        let client = builder.build().expect("failed to build reqwest client");
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = resp.json().await?;
        let text = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
