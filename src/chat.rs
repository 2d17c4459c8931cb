//! Answer synthesis over persisted insights and recent conversation.
//!
//! The context assembler turns the structured insights mapping plus chat
//! history into one deterministic prompt block; the answer pipeline wraps it
//! in the analyst instruction template and makes a single free-text
//! completion call. Unlike insight generation, failures here propagate: a
//! fabricated answer is worse than an explicit error.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::llm::client::{CompletionBackend, CompletionOptions};
use crate::llm::prompts::build_answer_prompt;
use crate::utils::{format_count, format_currency, format_signed_percent};

/// Number of most-recent exchanges embedded in the prompt context.
const HISTORY_WINDOW: usize = 3;
/// Entries kept from each top-N summary list.
const SUMMARY_LIMIT: usize = 5;
/// Trailing months kept from the monthly revenue series.
const RECENT_MONTHS: usize = 3;

const ANSWER_MAX_TOKENS: u32 = 300;

/// One past question/answer pair, chronological by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// The persisted analysis a question is asked against: the spreadsheet
/// description plus the merged insights mapping (precomputed statistics
/// layered under previously generated narrative insights).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisData {
    pub description: String,
    /// Arbitrary mapping; every field is optional and read defensively.
    #[serde(default)]
    pub insights: Value,
}

/// Transient per-call request; persistence of files, analyses, and history
/// belongs to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswerRequest {
    pub file_id: String,
    pub user_id: String,
    pub question: String,
    pub analysis_data: AnalysisData,
    pub chat_history: Vec<ChatExchange>,
}

/// Renders up to the last [`HISTORY_WINDOW`] exchanges as `Q:`/`A:` lines,
/// chronological, newest last.
pub fn format_chat_history(history: &[ChatExchange]) -> String {
    if history.is_empty() {
        return "No previous conversation.".to_string();
    }

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|exchange| format!("Q: {}\nA: {}", exchange.question, exchange.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deterministically assembles the prompt context block from the analysis
/// data and recent history.
///
/// The description and conversation lines are always present. Every insight
/// line is independently optional: a missing key omits only its own line,
/// and the order of lines is fixed. Pure; no side effects.
pub fn build_answer_context(data: &AnalysisData, history: &[ChatExchange]) -> String {
    let insights = &data.insights;
    let mut parts = vec![
        format!("Spreadsheet Description: {}", data.description),
        format!("Previous Conversation: {}", format_chat_history(history)),
    ];

    if let Some(reps) = insights.get("top_sales_reps") {
        if let Some(best) = reps.get("best_performer") {
            if let (Some(name), Some(total), Some(transactions)) = (
                string_field(best, "name"),
                number_field(best, "total_sales"),
                number_field(best, "transactions"),
            ) {
                parts.push(format!(
                    "Best Sales Rep: {} with {} in total sales ({} transactions)",
                    name,
                    format_currency(total),
                    format_count(transactions as i64)
                ));
            }
        }
        if let Some(summary) = summarize_entries(reps.get("all_reps"), "name", "total_sales") {
            parts.push(format!("All Sales Reps Performance: {}", summary));
        }
    }

    if let Some(summary) = summarize_entries(insights.get("top_products"), "name", "total_revenue")
    {
        parts.push(format!("Top Products: {}", summary));
    }

    if let Some(summary) = summarize_entries(insights.get("top_customers"), "name", "total_spent") {
        parts.push(format!("Top Customers: {}", summary));
    }

    if let Some(summary) =
        summarize_entries(insights.get("revenue_by_category"), "category", "revenue")
    {
        parts.push(format!("Revenue by Category: {}", summary));
    }

    if let Some(summary) = summarize_entries(
        insights.get("regional_performance"),
        "region",
        "total_revenue",
    ) {
        parts.push(format!("Regional Performance: {}", summary));
    }

    if let Some(total) = number_field(insights, "total_revenue") {
        parts.push(format!("Total Revenue: {}", format_currency(total)));
    }
    if let Some(average) = number_field(insights, "average_transaction") {
        parts.push(format!("Average Transaction: {}", format_currency(average)));
    }
    if let Some(count) = number_field(insights, "total_transactions") {
        parts.push(format!("Total Transactions: {}", format_count(count as i64)));
    }

    if let Some(months) = insights.get("monthly_trends").and_then(Value::as_array) {
        let start = months.len().saturating_sub(RECENT_MONTHS);
        let recent: Vec<String> = months[start..]
            .iter()
            .filter_map(|month| {
                let label = string_field(month, "month")?;
                let revenue = number_field(month, "revenue")?;
                Some(format!("{}: {}", label, format_currency(revenue)))
            })
            .collect();
        if !recent.is_empty() {
            parts.push(format!("Recent Monthly Revenue: {}", recent.join(", ")));
        }
    }

    if let Some(growth) = number_field(insights, "monthly_growth_rate") {
        parts.push(format!(
            "Monthly Growth Rate: {}",
            format_signed_percent(growth)
        ));
    }

    if let Some(trends) = string_list(insights.get("trends")) {
        parts.push(format!("Identified Trends: {}", trends.join(", ")));
    }
    if let Some(anomalies) = string_list(insights.get("anomalies")) {
        parts.push(format!("Anomalies: {}", anomalies.join(", ")));
    }
    if let Some(predictions) = string_list(insights.get("predictions")) {
        parts.push(format!("Predictions: {}", predictions.join(", ")));
    }

    parts.join("\n\n")
}

/// Renders the first [`SUMMARY_LIMIT`] entries of a list of named amounts
/// as `Name: $1,234.56, ...`. Entries missing either field are skipped;
/// an absent or empty list yields nothing.
fn summarize_entries(entries: Option<&Value>, name_key: &str, value_key: &str) -> Option<String> {
    let entries = entries?.as_array()?;
    let summary: Vec<String> = entries
        .iter()
        .take(SUMMARY_LIMIT)
        .filter_map(|entry| {
            let name = string_field(entry, name_key)?;
            let value = number_field(entry, value_key)?;
            Some(format!("{}: {}", name, format_currency(value)))
        })
        .collect();

    if summary.is_empty() {
        None
    } else {
        Some(summary.join(", "))
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn string_list(value: Option<&Value>) -> Option<Vec<&str>> {
    let entries: Vec<&str> = value?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Single-stage answer pipeline: assemble context, call the backend once,
/// return the trimmed text. Errors propagate to the caller untouched.
pub struct ChatAnswerer<C> {
    backend: C,
}

impl<C: CompletionBackend> ChatAnswerer<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    pub async fn answer(&self, request: &ChatAnswerRequest) -> Result<String> {
        let context = build_answer_context(&request.analysis_data, &request.chat_history);
        let prompt = build_answer_prompt(&context, &request.question);

        let completion = self
            .backend
            .complete(&prompt, &CompletionOptions::free_text(ANSWER_MAX_TOKENS))
            .await?;

        let answer = completion.text.trim().to_string();
        info!(
            "Generated chat answer (file {}, question: {})",
            request.file_id, request.question
        );
        Ok(answer)
    }
}
