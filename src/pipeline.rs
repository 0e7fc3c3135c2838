//! The evaluation pipeline.
//!
//! `prepare` turns the two raw inputs into a prompt, the caller sends it to
//! the evaluator, and `accept` validates the returned draft before anything
//! is recorded. The network call sits between the two so that dry runs and
//! tests can drive either half on its own.

use crate::agent::build_prompt;
use crate::analysis::{detect_relevant_categories, DetectedCategory};
use crate::error::ValidationError;
use crate::history::HistoryStore;
use crate::models::{DetailLevel, EvaluationDraft, EvaluationInputs, EvaluationRecord};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Everything needed to request an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEvaluation {
    pub inputs: EvaluationInputs,
    pub categories: Vec<DetectedCategory>,
    pub prompt: String,
}

/// Trim the inputs, detect extra dimensions and assemble the prompt.
pub fn prepare(
    grant_call: &str,
    project_desc: &str,
    detail: DetailLevel,
) -> Result<PreparedEvaluation, ValidationError> {
    let grant_call = grant_call.trim();
    let project_desc = project_desc.trim();

    if grant_call.is_empty() {
        return Err(ValidationError::MissingField("grantCall"));
    }
    if project_desc.is_empty() {
        return Err(ValidationError::MissingField("projectDesc"));
    }

    let categories = detect_relevant_categories(&format!("{grant_call} {project_desc}"));
    info!(count = categories.len(), "Detected additional evaluation dimensions");
    for category in &categories {
        debug!("  + {}", category.name);
    }

    let prompt = build_prompt(grant_call, project_desc, &categories, detail);
    debug!(detail = %detail, "Prompt assembled: {} bytes", prompt.len());

    Ok(PreparedEvaluation {
        inputs: EvaluationInputs {
            grant_call: grant_call.to_string(),
            project_desc: project_desc.to_string(),
        },
        categories,
        prompt,
    })
}

/// Validate a draft and record it in history.
///
/// A rejected draft never reaches the store.
pub fn accept(
    draft: EvaluationDraft,
    inputs: &EvaluationInputs,
    timestamp: DateTime<Utc>,
    store: &HistoryStore,
) -> Result<EvaluationRecord, ValidationError> {
    let record = draft.into_record(inputs, timestamp)?;
    store.record(record.clone());
    info!(
        project = %record.project_name,
        score = %record.display_total(),
        "Evaluation accepted"
    );
    Ok(record)
}
