//! Staged insight generation over one shared, run-scoped state.
//!
//! Three fixed stages (`trends`, `anomalies`, `predictions`) each make one
//! completion call and write exactly one key into the shared insight map.
//! Failures are absorbed per stage: a stage that cannot produce a real
//! result writes its static fallback and the sequence continues, so the
//! caller always receives a complete mapping.

use std::collections::BTreeMap;

use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::Sender;

use crate::error::{InsightError, Result};
use crate::llm::client::{CompletionBackend, CompletionOptions};
use crate::llm::prompts::build_insight_prompt;
use crate::llm::types::PipelineEvent;
use crate::truncate::truncate;

/// Pipeline-level cap on the raw data sample, applied before any stage runs.
pub const RAW_TEXT_LIMIT: usize = 1500;
/// Pipeline-level cap on the user-supplied description.
pub const DESCRIPTION_LIMIT: usize = 500;

const STAGE_MAX_TOKENS: u32 = 300;
const STAGE_TEMPERATURE: f32 = 0.3;
const RESPONSE_LOG_PREVIEW_CHARS: usize = 200;

/// Aggregated pipeline output: insight key to narrative entries.
pub type InsightMap = BTreeMap<String, Vec<String>>;

/// Shared state threaded through the ordered stage sequence. Owned by the
/// orchestrator for the duration of one run and discarded afterwards.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub raw_text: String,
    pub description: String,
    pub insights: InsightMap,
}

/// One stage of the insight pipeline, fully described by data. A single
/// generic runner executes every stage, so behavior differences live here
/// rather than in per-stage code.
#[derive(Debug, Clone)]
pub struct InsightStageSpec {
    pub name: &'static str,
    /// Key this stage writes into the shared insight map.
    pub result_key: &'static str,
    /// Task statement placed at the top of the stage prompt.
    pub instruction: &'static str,
    /// What the requested list contains, e.g. "trend descriptions".
    pub item_noun: &'static str,
    /// One-shot example of the expected JSON shape.
    pub example: &'static str,
    /// Written when the backend answered validly but bore no content.
    pub no_result: &'static str,
    /// Written when the response body was not parseable JSON.
    pub parse_fallback: &'static str,
    /// Written when the completion call itself failed.
    pub error_fallback: &'static str,
}

/// Fixed execution order: trends, anomalies, predictions. Stages do not read
/// each other's results, so the order only fixes call sequencing.
pub const INSIGHT_STAGES: [InsightStageSpec; 3] = [
    InsightStageSpec {
        name: "analyze_trends",
        result_key: "trends",
        instruction:
            "Analyze the following spreadsheet data to identify 2-3 key business trends.",
        item_noun: "trend descriptions",
        example: r#"{"trends": ["Sales increased by 15% month-over-month", "Technology products show highest growth"]}"#,
        no_result: "Unable to identify specific trends",
        parse_fallback: "Error parsing trends analysis",
        error_fallback: "Error analyzing trends",
    },
    InsightStageSpec {
        name: "analyze_anomalies",
        result_key: "anomalies",
        instruction: "Analyze the following data to identify 1-2 anomalies or unusual patterns.",
        item_noun: "anomaly descriptions",
        example: r#"{"anomalies": ["Unusually high returns in March", "Spike in weekend sales"]}"#,
        no_result: "No significant anomalies detected",
        parse_fallback: "Error parsing anomalies analysis",
        error_fallback: "Error analyzing anomalies",
    },
    InsightStageSpec {
        name: "generate_predictions",
        result_key: "predictions",
        instruction:
            "Based on the following data, generate 1-2 business predictions or recommendations.",
        item_noun: "predictions",
        example: r#"{"predictions": ["Expect 10% growth next quarter", "Consider expanding top-performing regions"]}"#,
        no_result: "Unable to generate specific predictions",
        parse_fallback: "Error parsing predictions analysis",
        error_fallback: "Error generating predictions",
    },
];

/// Why a stage wrote a fallback instead of a backend-produced result.
#[derive(Debug)]
pub enum StageFailure {
    /// The completion call failed (transport, backend, or malformed reply).
    Completion(InsightError),
    /// The response body was not a JSON object.
    Parse(serde_json::Error),
}

/// Outcome of one stage run. The values carried are exactly what was
/// written into the shared state, so callers can assert both *what* a stage
/// produced and *why*.
#[derive(Debug)]
pub enum StageOutcome {
    /// The backend produced a usable list.
    Generated(Vec<String>),
    /// The backend replied with valid JSON but the result field was absent
    /// or empty; the stage's "no result" placeholder was written.
    NoFindings(Vec<String>),
    /// The stage failed and wrote its static fallback.
    Fallback {
        values: Vec<String>,
        cause: StageFailure,
    },
}

impl StageOutcome {
    pub fn values(&self) -> &[String] {
        match self {
            StageOutcome::Generated(values) => values,
            StageOutcome::NoFindings(values) => values,
            StageOutcome::Fallback { values, .. } => values,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }
}

/// Runs one stage: build the prompt, call the backend, parse the named list
/// field, and write the result (or a fallback) into `state.insights`.
/// All failures are absorbed here; this never returns an error.
pub async fn run_stage<C>(
    backend: &C,
    spec: &InsightStageSpec,
    state: &mut PipelineState,
) -> StageOutcome
where
    C: CompletionBackend + ?Sized,
{
    let prompt = build_insight_prompt(spec, state);
    let options = CompletionOptions::json(STAGE_MAX_TOKENS, STAGE_TEMPERATURE);

    let outcome = match backend.complete(&prompt, &options).await {
        Ok(completion) => {
            let content = completion.text.trim();
            info!(
                "Raw {} response: {}",
                spec.name,
                preview(content, RESPONSE_LOG_PREVIEW_CHARS)
            );

            match serde_json::from_str::<Value>(content) {
                Ok(body) => match extract_items(&body, spec.result_key) {
                    Some(items) if !items.is_empty() => {
                        info!("Generated {}: {} items", spec.result_key, items.len());
                        StageOutcome::Generated(items)
                    }
                    _ => StageOutcome::NoFindings(vec![spec.no_result.to_string()]),
                },
                Err(parse_err) => {
                    warn!(
                        "Failed to parse {} JSON: {} (content: {})",
                        spec.name,
                        parse_err,
                        preview(content, 100)
                    );
                    StageOutcome::Fallback {
                        values: vec![spec.parse_fallback.to_string()],
                        cause: StageFailure::Parse(parse_err),
                    }
                }
            }
        }
        Err(completion_err) => {
            error!("Error in {}: {}", spec.name, completion_err);
            StageOutcome::Fallback {
                values: vec![spec.error_fallback.to_string()],
                cause: StageFailure::Completion(completion_err),
            }
        }
    };

    state
        .insights
        .insert(spec.result_key.to_string(), outcome.values().to_vec());
    outcome
}

/// Reads the named list field defensively: an array keeps its string
/// entries (anything else is skipped), a bare string becomes a one-element
/// list, any other shape yields nothing.
fn extract_items(body: &Value, key: &str) -> Option<Vec<String>> {
    match body.get(key)? {
        Value::Array(entries) => Some(
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(|s| s.to_string()))
                .collect(),
        ),
        Value::String(single) => Some(vec![single.clone()]),
        _ => None,
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// The outer fallback mapping: returned whenever the pipeline as a whole
/// cannot run, so the downstream merge with precomputed statistics never
/// sees a missing key.
pub fn fallback_insights() -> InsightMap {
    let mut insights = InsightMap::new();
    insights.insert(
        "trends".to_string(),
        vec!["Unable to analyze trends due to technical error".to_string()],
    );
    insights.insert(
        "anomalies".to_string(),
        vec!["Unable to analyze anomalies due to technical error".to_string()],
    );
    insights.insert(
        "predictions".to_string(),
        vec!["Unable to generate predictions due to technical error".to_string()],
    );
    insights
}

/// Layers the generated insight lists over a precomputed statistics mapping.
///
/// AI-generated fields take precedence over precomputed fields with the
/// same name. Collisions are not expected in practice, but the precedence
/// is part of the contract rather than an accident of merge order.
pub fn merge_insights(computed: &Value, generated: &InsightMap) -> serde_json::Map<String, Value> {
    let mut merged = computed.as_object().cloned().unwrap_or_default();
    for (key, values) in generated {
        merged.insert(key.clone(), Value::from(values.clone()));
    }
    merged
}

/// Sequences the insight stages over one run-scoped [`PipelineState`] and
/// aggregates the final mapping. The public surface is infallible: any
/// failure the stages could not absorb degrades to [`fallback_insights`].
pub struct InsightGenerator<C> {
    backend: C,
    raw_text_limit: usize,
    description_limit: usize,
}

impl<C: CompletionBackend> InsightGenerator<C> {
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            raw_text_limit: RAW_TEXT_LIMIT,
            description_limit: DESCRIPTION_LIMIT,
        }
    }

    /// Override the pipeline-level truncation caps.
    pub fn with_context_limits(mut self, raw_text_limit: usize, description_limit: usize) -> Self {
        self.raw_text_limit = raw_text_limit;
        self.description_limit = description_limit;
        self
    }

    pub async fn generate_insights(&self, raw_text: &str, description: &str) -> InsightMap {
        self.generate_insights_with_progress(raw_text, description, None)
            .await
    }

    /// Like [`generate_insights`](Self::generate_insights), reporting
    /// progress over an optional channel as each stage starts and finishes.
    pub async fn generate_insights_with_progress(
        &self,
        raw_text: &str,
        description: &str,
        progress: Option<Sender<PipelineEvent>>,
    ) -> InsightMap {
        match self.run_pipeline(raw_text, description, &progress).await {
            Ok(insights) => {
                info!("AI insights generated successfully");
                send_event(&progress, PipelineEvent::Completed).await;
                insights
            }
            Err(err) => {
                error!("Failed to generate insights: {}", err);
                send_event(
                    &progress,
                    PipelineEvent::Failed {
                        reason: err.to_string(),
                    },
                )
                .await;
                fallback_insights()
            }
        }
    }

    async fn run_pipeline(
        &self,
        raw_text: &str,
        description: &str,
        progress: &Option<Sender<PipelineEvent>>,
    ) -> Result<InsightMap> {
        let truncated_text = truncate(raw_text, self.raw_text_limit);
        let truncated_description = truncate(description, self.description_limit);
        info!(
            "Starting insight generation (raw text {} chars, truncated to {})",
            raw_text.chars().count(),
            truncated_text.chars().count()
        );
        send_event(progress, PipelineEvent::Starting).await;

        let mut state = PipelineState {
            raw_text: truncated_text,
            description: truncated_description,
            insights: InsightMap::new(),
        };

        for spec in &INSIGHT_STAGES {
            send_event(
                progress,
                PipelineEvent::StageStarted {
                    stage: spec.name.to_string(),
                },
            )
            .await;

            let outcome = run_stage(&self.backend, spec, &mut state).await;

            send_event(
                progress,
                PipelineEvent::StageCompleted {
                    stage: spec.name.to_string(),
                    degraded: outcome.is_fallback(),
                },
            )
            .await;
        }

        // Stages absorb their own failures, so the only way to get here
        // without all three keys is a misconfigured stage list.
        for spec in &INSIGHT_STAGES {
            match state.insights.get(spec.result_key) {
                Some(values) if !values.is_empty() => {}
                _ => return Err(InsightError::IncompleteInsights(spec.result_key)),
            }
        }

        Ok(state.insights)
    }
}

async fn send_event(progress: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}
