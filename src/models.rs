//! Data models for grant evaluations.
//!
//! `EvaluationDraft` is the loosely-typed shape returned by the external
//! evaluator; `EvaluationRecord` is the validated, immutable result that the
//! history store keeps and the layout engine renders.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Highest score a single criterion may receive.
pub const MAX_CRITERION_SCORE: f64 = 10.0;

/// Highest overall score, expressed as a percentage.
pub const MAX_TOTAL_SCORE: f64 = 100.0;

/// How much narrative the evaluator is asked to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Short paragraphs, few recommendations
    Concise,
    /// Balanced depth (default)
    #[default]
    Standard,
    /// Multi-paragraph analysis for every section
    Detailed,
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailLevel::Concise => write!(f, "concise"),
            DetailLevel::Standard => write!(f, "standard"),
            DetailLevel::Detailed => write!(f, "detailed"),
        }
    }
}

/// One judged criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub criteria: String,
    pub score: f64,
    #[serde(default)]
    pub comments: String,
}

impl ScoreEntry {
    /// Score rendered as `"{score}/10"`.
    pub fn display_score(&self) -> String {
        format!("{}/10", self.score)
    }
}

/// The two free-text inputs an evaluation was produced from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInputs {
    pub grant_call: String,
    pub project_desc: String,
}

/// A validated evaluation of one proposal against one grant call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub project_name: String,
    pub grant_name: String,
    pub summary: String,
    pub scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub innovation_analysis: String,
    #[serde(default)]
    pub reviewer_feedback: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub final_assessment: String,
    pub total_score: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub grant_call: String,
    #[serde(default)]
    pub project_desc: String,
}

impl EvaluationRecord {
    /// Check the range and presence invariants of a record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.summary.trim().is_empty() {
            return Err(ValidationError::EmptySummary);
        }
        if self.scores.is_empty() {
            return Err(ValidationError::EmptyScores);
        }
        for entry in &self.scores {
            if !entry.score.is_finite() || !(0.0..=MAX_CRITERION_SCORE).contains(&entry.score) {
                return Err(ValidationError::ScoreOutOfRange {
                    criteria: entry.criteria.clone(),
                    score: entry.score,
                });
            }
        }
        if !self.total_score.is_finite() || !(0.0..=MAX_TOTAL_SCORE).contains(&self.total_score)
        {
            return Err(ValidationError::TotalScoreOutOfRange(self.total_score));
        }
        Ok(())
    }

    /// Overall score as an integer percentage, e.g. `"78%"`.
    pub fn display_total(&self) -> String {
        format!("{}%", self.total_score.round() as i64)
    }
}

/// A score entry as the evaluator returned it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftScore {
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Evaluator output before validation. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDraft {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub grant_name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scores: Option<Vec<DraftScore>>,
    #[serde(default)]
    pub innovation_analysis: Option<String>,
    #[serde(default)]
    pub reviewer_feedback: Option<String>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub final_assessment: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_score: Option<f64>,
}

impl EvaluationDraft {
    /// Turn a draft into a validated record.
    ///
    /// This is the only way a record enters the system from the evaluator, so
    /// every required field and range check happens here.
    pub fn into_record(
        self,
        inputs: &EvaluationInputs,
        timestamp: DateTime<Utc>,
    ) -> Result<EvaluationRecord, ValidationError> {
        let project_name = self
            .project_name
            .ok_or(ValidationError::MissingField("projectName"))?;
        let grant_name = self
            .grant_name
            .ok_or(ValidationError::MissingField("grantName"))?;
        let summary = self.summary.ok_or(ValidationError::MissingField("summary"))?;
        let draft_scores = self.scores.ok_or(ValidationError::MissingField("scores"))?;
        let total_score = self
            .total_score
            .ok_or(ValidationError::MissingField("totalScore"))?;

        let scores = draft_scores
            .into_iter()
            .map(|s| {
                Ok(ScoreEntry {
                    criteria: s
                        .criteria
                        .ok_or(ValidationError::MissingField("scores.criteria"))?,
                    score: s.score.ok_or(ValidationError::MissingField("scores.score"))?,
                    comments: s.comments.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let record = EvaluationRecord {
            project_name,
            grant_name,
            summary,
            scores,
            innovation_analysis: self.innovation_analysis.unwrap_or_default(),
            reviewer_feedback: self.reviewer_feedback.unwrap_or_default(),
            recommendations: self.recommendations.unwrap_or_default(),
            final_assessment: self.final_assessment.unwrap_or_default(),
            total_score,
            timestamp,
            grant_call: inputs.grant_call.clone(),
            project_desc: inputs.project_desc.clone(),
        };

        record.validate()?;
        Ok(record)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accept `7`, `7.5`, `"7"`, `"78%"` or `"7/10"`. Text that is not a number
/// is treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            let trimmed = trimmed.strip_suffix("/10").unwrap_or(trimmed);
            trimmed.trim_end_matches('%').trim().parse::<f64>().ok()
        }
    })
}
