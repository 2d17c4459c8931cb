use serde::{Deserialize, Serialize};

/// Progress events emitted while the insight pipeline runs.
///
/// Delivery is best-effort: the pipeline never blocks or fails because a
/// receiver went away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    Starting,
    StageStarted { stage: String },
    /// `degraded` is true when the stage wrote a fallback instead of a
    /// backend-produced result.
    StageCompleted { stage: String, degraded: bool },
    Completed,
    Failed { reason: String },
}

// Wire types for an OpenAI-compatible `chat/completions` endpoint.

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format: "json_object".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

/// Assistant message as returned by the backend. `content` can be absent on
/// malformed or tool-call responses, which callers treat as an error.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}
