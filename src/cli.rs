//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::DetailLevel;
use clap::Parser;
use std::path::PathBuf;

/// PreGrant - AI-assisted pre-submission grant proposal evaluation
///
/// Scores a project description against a grant call with a language model
/// and exports a paginated PDF evaluation report.
///
/// Examples:
///   pregrant --grant-call call.txt --project proposal.txt
///   pregrant --grant-call call.txt --project proposal.txt --detail detailed
///   pregrant --grant-call call.txt --project proposal.txt --dry-run
///   pregrant --history
///   pregrant --from-history 0 --format json
///   pregrant --input evaluation.json --output report.pdf
///   pregrant --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// File containing the grant call text
    #[arg(short, long, value_name = "FILE", requires = "project")]
    pub grant_call: Option<PathBuf>,

    /// File containing the project description
    #[arg(short, long, value_name = "FILE", requires = "grant_call")]
    pub project: Option<PathBuf>,

    /// Render an existing evaluation record (JSON) without calling the evaluator
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["grant_call", "from_history"])]
    pub input: Option<PathBuf>,

    /// List saved evaluations, newest first
    #[arg(long, conflicts_with_all = ["grant_call", "input", "from_history"])]
    pub history: bool,

    /// Re-render a saved evaluation (0 = newest)
    #[arg(long, value_name = "INDEX", conflicts_with = "grant_call")]
    pub from_history: Option<usize>,

    /// Output file or directory for the report
    ///
    /// Defaults to the configured output directory with a name derived
    /// from the project name.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format (pdf, json)
    #[arg(long, default_value = "pdf", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Depth of the generated narrative
    #[arg(short, long, value_name = "LEVEL")]
    pub detail: Option<DetailLevel>,

    /// Title printed in the report banner and footers
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Model to use for the evaluation
    #[arg(short, long, env = "PREGRANT_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible chat completions endpoint
    #[arg(long, value_name = "URL", env = "PREGRANT_API_URL")]
    pub api_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory holding the evaluation history
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pregrant.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: show detected categories and the prompt without calling the LLM
    #[arg(long, requires = "grant_call")]
    pub dry_run: bool,

    /// Check that the evaluator API is reachable and the key is accepted
    #[arg(long)]
    pub check_connection: bool,

    /// Generate a default .pregrant.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Paginated PDF (default)
    #[default]
    Pdf,
    /// The validated evaluation record as JSON
    Json,
}

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CheckConnection,
    ListHistory,
    FromHistory(usize),
    RenderInput(PathBuf),
    Evaluate {
        grant_call: PathBuf,
        project: PathBuf,
    },
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command().is_none() {
            return Err(
                "Nothing to do: pass --grant-call and --project, --input, --history or --from-history"
                    .to_string(),
            );
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        for path in [&self.grant_call, &self.project, &self.input].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// The action selected by the flags, if any.
    pub fn command(&self) -> Option<Command> {
        if self.check_connection {
            return Some(Command::CheckConnection);
        }
        if self.history {
            return Some(Command::ListHistory);
        }
        if let Some(index) = self.from_history {
            return Some(Command::FromHistory(index));
        }
        if let Some(ref input) = self.input {
            return Some(Command::RenderInput(input.clone()));
        }
        match (&self.grant_call, &self.project) {
            (Some(grant_call), Some(project)) => Some(Command::Evaluate {
                grant_call: grant_call.clone(),
                project: project.clone(),
            }),
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
