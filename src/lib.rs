//! # Spreadsheet Insights
//!
//! A library for turning a spreadsheet export (raw text sample plus a short
//! description) into narrative business insights, and for answering
//! free-form questions grounded in previously computed analysis data.
//!
//! ## Core Concepts
//!
//! - **Insight pipeline**: three fixed stages (trends, anomalies,
//!   predictions) run strictly in sequence over one shared state; each stage
//!   makes a single completion call and writes exactly one key. Stage
//!   failures are absorbed with static fallbacks, so the caller always
//!   receives a complete mapping.
//! - **Answer pipeline**: a single completion call over a deterministic
//!   context block built from the persisted insights and the last few chat
//!   exchanges. Failures here propagate; no answer is fabricated.
//! - **Completion backend**: any generative text service behind the
//!   [`CompletionBackend`] trait. [`TogetherClient`] adapts an
//!   OpenAI-compatible `chat/completions` endpoint.
//! - **Merge contract**: AI-generated fields take precedence over
//!   precomputed fields with the same name (see [`merge_insights`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use spreadsheet_insights::*;
//!
//! let client = TogetherClient::from_env()?;
//!
//! let generator = InsightGenerator::new(client.clone());
//! let insights = generator
//!     .generate_insights(&raw_csv_text, "Monthly sales by region")
//!     .await;
//!
//! let answerer = ChatAnswerer::new(client);
//! let answer = answerer
//!     .answer(&ChatAnswerRequest {
//!         file_id: "f-123".to_string(),
//!         user_id: "u-456".to_string(),
//!         question: "Who is the best sales rep?".to_string(),
//!         analysis_data: AnalysisData {
//!             description: "Monthly sales by region".to_string(),
//!             insights: merged_insights_value,
//!         },
//!         chat_history: vec![],
//!     })
//!     .await?;
//! ```

pub mod chat;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod truncate;
pub mod utils;

pub use chat::{
    build_answer_context, format_chat_history, AnalysisData, ChatAnswerRequest, ChatAnswerer,
    ChatExchange,
};
pub use error::{InsightError, Result};
pub use llm::client::{
    Completion, CompletionBackend, CompletionConfig, CompletionOptions, TogetherClient,
};
pub use llm::types::PipelineEvent;
pub use pipeline::{
    fallback_insights, merge_insights, run_stage, InsightGenerator, InsightMap, InsightStageSpec,
    PipelineState, StageFailure, StageOutcome, INSIGHT_STAGES,
};
pub use truncate::{truncate, TRUNCATION_SUFFIX};
