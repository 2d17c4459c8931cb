//! Prompt templates for the insight stages and the answer pipeline.

use crate::pipeline::{InsightStageSpec, PipelineState};

/// Stage-local cap on the raw-data sample embedded in each stage prompt.
/// Applies on top of the pipeline-level truncation.
pub const STAGE_SAMPLE_CHARS: usize = 800;

/// Builds the prompt for one insight stage: instruction, bounded data
/// sample, description, and an explicit JSON contract with a one-shot
/// example of the expected shape.
pub fn build_insight_prompt(spec: &InsightStageSpec, state: &PipelineState) -> String {
    let sample: String = state.raw_text.chars().take(STAGE_SAMPLE_CHARS).collect();

    format!(
        "{instruction}\n\n\
         Data Sample:\n{sample}\n\n\
         Description:\n{description}\n\n\
         Return a JSON object with a '{key}' key containing a list of {noun}.\n\
         Example: {example}",
        instruction = spec.instruction,
        sample = sample,
        description = state.description,
        key = spec.result_key,
        noun = spec.item_noun,
        example = spec.example,
    )
}

/// Builds the answer-synthesis prompt around an assembled context block.
/// The instructions pin the model to the supplied computed data: concrete
/// figures over calculation suggestions, and an explicit flag when the
/// exact answer is not present.
pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI business analyst. Answer the user's question using the provided \
         computed data and insights. Give direct, specific answers with actual numbers \
         when available. Do not suggest how to calculate things - use the computed results.\n\n\
         Available Data:\n{context}\n\n\
         Question: {question}\n\n\
         Instructions:\n\
         - Use specific numbers and names from the computed data\n\
         - Be concise and direct\n\
         - If the exact answer isn't in the data, say so and provide the closest relevant information\n\
         - Format currency values clearly (e.g., $1,234.56)\n\
         - Do not suggest calculations or code - use the provided computed results",
        context = context,
        question = question,
    )
}
