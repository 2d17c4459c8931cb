use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::error::{InsightError, Result};
use crate::llm::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat,
};

const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
const DEFAULT_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Per-call generation parameters.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature; `None` uses the backend default.
    pub temperature: Option<f32>,
    /// When true, the backend is asked to emit a single JSON object.
    pub json_object: bool,
}

impl CompletionOptions {
    pub fn json(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature: Some(temperature),
            json_object: true,
        }
    }

    pub fn free_text(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: None,
            json_object: false,
        }
    }
}

/// One generated completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
}

/// The single operation the pipelines need from a generative backend:
/// submit a prompt, get text back. Implementations must be safe to share
/// across concurrent pipeline runs.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion>;
}

/// Connection settings for [`TogetherClient`], loaded from the environment
/// by default.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// Explicit per-request timeout. A timed-out call surfaces as a
    /// transport error and follows the same fallback path as any other
    /// completion failure.
    pub request_timeout: Duration,
}

impl CompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: TOGETHER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Reads `TOGETHER_API_KEY` (required) and the optional
    /// `TOGETHER_BASE_URL`, `TOGETHER_MODEL`, and `TOGETHER_TIMEOUT_MS`
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TOGETHER_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(InsightError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = std::env::var("TOGETHER_BASE_URL")
            .ok()
            .filter(|value| !value.is_empty())
        {
            config.base_url = base_url;
        }
        if let Some(model) = std::env::var("TOGETHER_MODEL")
            .ok()
            .filter(|value| !value.is_empty())
        {
            config.model = model;
        }
        if let Some(timeout_ms) = std::env::var("TOGETHER_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_millis(timeout_ms);
        }
        Ok(config)
    }
}

/// Reqwest adapter for Together's OpenAI-compatible `chat/completions`
/// endpoint. Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct TogetherClient {
    client: Client,
    config: CompletionConfig,
}

impl TogetherClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CompletionConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionBackend for TogetherClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("POST {} (model {})", url, self.config.model);

        let payload = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_object.then(ResponseFormat::json_object),
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(InsightError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatCompletionResponse = res.json().await?;
        let text = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| {
                InsightError::MalformedResponse(
                    "no assistant message content in completion response".to_string(),
                )
            })?
            .to_string();

        Ok(Completion {
            text,
            model: body.model,
        })
    }
}
