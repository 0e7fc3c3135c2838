//! External evaluator integration.
//!
//! This module builds the evaluation prompt and talks to the
//! language-model API that turns it into a structured draft.

pub mod client;
pub mod prompt;

pub use client::{EvaluatorClient, EvaluatorConfig};
pub use prompt::build_prompt;
