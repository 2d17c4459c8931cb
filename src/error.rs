use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Missing API key: set TOGETHER_API_KEY or provide one in CompletionConfig")]
    MissingApiKey,

    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion backend error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Insight pipeline finished without a usable '{0}' result")]
    IncompleteInsights(&'static str),
}

pub type Result<T> = std::result::Result<T, InsightError>;
