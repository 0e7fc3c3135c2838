//! Error types for the evaluation pipeline.
//!
//! Each stage owns its own error enum so callers can tell a malformed
//! record from a storage fault or an unreachable evaluator.

use thiserror::Error;

/// A malformed or out-of-range evaluation record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("evaluation has no scores")]
    EmptyScores,

    #[error("evaluation summary is empty")]
    EmptySummary,

    #[error("score {score} for `{criteria}` is outside 0-10")]
    ScoreOutOfRange { criteria: String, score: f64 },

    #[error("total score {0} is outside 0-100")]
    TotalScoreOutOfRange(f64),
}

/// Persistence read/write failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("persisted history is corrupt: {0}")]
    Corrupt(String),
}

/// History lookups outside the stored range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history index {index} out of range (history holds {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// An internal layout invariant was violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("layout width must be positive, got {0}")]
    InvalidWidth(f64),

    #[error("measurement produced a non-finite height for {0}")]
    NonFiniteMeasurement(&'static str),

    #[error("cursor {cursor} escaped page bounds on page {page}")]
    Cursor { page: usize, cursor: f64 },
}

/// Failure of a full `render()` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("invalid evaluation: {0}")]
    Validation(#[from] ValidationError),

    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),
}

/// The external evaluator call failed or returned an unusable shape.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("could not connect to the evaluator API: {0}")]
    Connectivity(String),

    #[error("evaluator API authentication failed, check your API key")]
    Authentication,

    #[error("too many requests to the evaluator API, try again later")]
    RateLimited,

    #[error("evaluator returned an unusable response: {0}")]
    MalformedResponse(String),

    #[error("evaluator API error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("API key not set, export {0}")]
    MissingApiKey(String),
}

impl UpstreamError {
    /// Short classification label used in user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Connectivity(_) => "connectivity",
            UpstreamError::Authentication | UpstreamError::MissingApiKey(_) => "authentication",
            UpstreamError::RateLimited => "rate-limit",
            UpstreamError::MalformedResponse(_) => "malformed-response",
            UpstreamError::Service { .. } => "service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_kind_labels() {
        assert_eq!(UpstreamError::RateLimited.kind(), "rate-limit");
        assert_eq!(UpstreamError::Authentication.kind(), "authentication");
        assert_eq!(
            UpstreamError::MalformedResponse("x".into()).kind(),
            "malformed-response"
        );
        assert_eq!(UpstreamError::Connectivity("refused".into()).kind(), "connectivity");
    }

    #[test]
    fn test_report_error_wraps_validation() {
        let err: ReportError = ValidationError::EmptyScores.into();
        assert_eq!(err.to_string(), "invalid evaluation: evaluation has no scores");
    }
}
