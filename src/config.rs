use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};

use crate::analyzer::PromptConfig;

/// Settings for the external generation backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout_ms: Option<u64>,
}

/// Settings for the source-control API (diff fetch and comment posting).
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub api_base: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared webhook secret. Absent means validation is skipped (development
    /// only); the fallback is logged at startup and on every delivery.
    pub webhook_secret: Option<String>,
    pub llm: LlmConfig,
    pub source: SourceConfig,
    pub prompts: PromptConfig,
    /// Maximum accepted raw request body size in bytes (None => unlimited)
    pub max_request_bytes: Option<usize>,
}

const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_SOURCE_API_BASE: &str = "https://api.github.com";

impl AppConfig {
    /// Build configuration from environment variables:
    ///
    /// * `LLM_API_KEY` (required) – key for the generation API.
    /// * `LLM_API_BASE`, `LLM_MODEL`, `LLM_TIMEOUT_MS` (optional).
    /// * `SOURCE_API_BASE`, `SOURCE_API_TOKEN` (optional).
    /// * `WEBHOOK_SECRET` (optional) – unset disables signature validation.
    /// * `VETGATE_PROMPTS` (optional) – path to a JSON prompt configuration.
    /// * `MAX_REQUEST_BYTES` (optional).
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .map_err(|_| anyhow!("LLM_API_KEY must be set: no generation backend available"))?;
        if api_key.trim().is_empty() {
            return Err(anyhow!(
                "LLM_API_KEY must be set: no generation backend available"
            ));
        }

        let llm = LlmConfig {
            api_key,
            api_base: env::var("LLM_API_BASE").unwrap_or_else(|_| DEFAULT_LLM_API_BASE.into()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.into()),
            timeout_ms: parse_optional_u64("LLM_TIMEOUT_MS")?,
        };

        let source = SourceConfig {
            api_base: env::var("SOURCE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SOURCE_API_BASE.into()),
            token: env::var("SOURCE_API_TOKEN").ok().filter(|t| !t.is_empty()),
        };

        let webhook_secret = env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
        if webhook_secret.is_none() {
            tracing::warn!(
                "WEBHOOK_SECRET not set; webhook signature validation is DISABLED (development only)"
            );
        }
        if source.token.is_none() {
            tracing::warn!("SOURCE_API_TOKEN not set; API calls will be unauthenticated");
        }

        let prompts = if let Ok(path) = env::var("VETGATE_PROMPTS") {
            let content = fs::read_to_string(&path).with_context(|| {
                format!("Failed to read VETGATE_PROMPTS '{}': file unreadable", path)
            })?;
            serde_json::from_str::<PromptConfig>(&content).with_context(|| {
                format!(
                    "Failed to parse VETGATE_PROMPTS '{}': invalid JSON configuration",
                    path
                )
            })?
        } else {
            PromptConfig::default()
        };

        let max_request_bytes = parse_optional_u64("MAX_REQUEST_BYTES")?.map(|v| v as usize);

        Ok(Self {
            webhook_secret,
            llm,
            source,
            prompts,
            max_request_bytes,
        })
    }
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
