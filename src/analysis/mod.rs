//! Input analysis modules.
//!
//! This module inspects the raw grant call and project description before
//! anything is sent to the evaluator.

pub mod categories;

pub use categories::{detect_relevant_categories, DetectedCategory};
