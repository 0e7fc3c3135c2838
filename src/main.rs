//! PreGrant - AI-assisted grant proposal pre-screening
//!
//! A CLI tool that scores a project description against a grant call with
//! an OpenAI-compatible language model, keeps a short history of past
//! evaluations, and exports paginated PDF reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (invalid input, evaluator failure, storage or export fault)

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod history;
mod models;
mod pipeline;
mod report;

use agent::EvaluatorClient;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::{HistoryError, ReportError, UpstreamError, ValidationError};
use history::{FileStore, HistoryStore};
use indicatif::{ProgressBar, ProgressStyle};
use models::{EvaluationDraft, EvaluationInputs, EvaluationRecord};
use report::layout::suggested_filename;
use report::{LayoutEngine, RenderOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match Config::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(log_level(&args, &config));

    info!("PreGrant v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("{:#}", e);
        eprintln!("\n❌ {}", describe_error(&e));
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .pregrant.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {CONFIG_FILE_NAME} already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content).with_context(|| format!("Failed to write {CONFIG_FILE_NAME}"))?;

    println!("✅ Created {CONFIG_FILE_NAME} with default settings.");
    println!("   The API key is read from the environment variable named by [model].api_key_env.");
    Ok(())
}

/// The effective log level: `--quiet` wins, then `[general].verbose`,
/// then the CLI flags.
fn log_level(args: &Args, config: &Config) -> tracing::Level {
    if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    }
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

/// Dispatch the selected command.
async fn run(args: Args, config: Config) -> Result<()> {
    let command = args
        .command()
        .context("No command given, see --help")?;

    match command {
        Command::CheckConnection => check_connection(&args, &config).await,
        Command::ListHistory => {
            let store = open_history(&config);
            print!("{}", report::generate_history_listing(&store.list()));
            Ok(())
        }
        Command::FromHistory(index) => {
            let store = open_history(&config);
            let record = store.get(index)?;
            info!(index, project = %record.project_name, "Re-rendering saved evaluation");
            export(&args, &config, &record)
        }
        Command::RenderInput(path) => {
            let record = load_record(&path)?;
            export(&args, &config, &record)
        }
        Command::Evaluate {
            grant_call,
            project,
        } => evaluate(&args, &config, &grant_call, &project).await,
    }
}

/// Handle --check-connection: a minimal completion round trip.
async fn check_connection(args: &Args, config: &Config) -> Result<()> {
    let client = EvaluatorClient::new(config.evaluator_config())?;

    let pb = spinner(args, &format!("Contacting {}", config.model.api_url));
    let result = client.check_connection().await;
    pb.finish_and_clear();
    result?;

    println!("✅ Evaluator API reachable with model {}", config.model.name);
    Ok(())
}

/// Run a full evaluation: prepare, call the evaluator, validate, record, export.
async fn evaluate(args: &Args, config: &Config, grant_call: &Path, project: &Path) -> Result<()> {
    let grant_call = read_input(grant_call)?;
    let project_desc = read_input(project)?;

    let prepared = pipeline::prepare(&grant_call, &project_desc, config.report.detail)?;

    // Handle --dry-run: show what would be sent and exit
    if args.dry_run {
        return handle_dry_run(&prepared);
    }

    let client = EvaluatorClient::new(config.evaluator_config())?;

    println!("🤖 Evaluating proposal...");
    println!("   Model: {}", config.model.name);
    println!("   Detail: {}", config.report.detail);
    println!("   Extra dimensions: {}", prepared.categories.len());

    let pb = spinner(args, "Waiting for the evaluator");
    let draft = client.evaluate(&prepared.prompt).await;
    pb.finish_and_clear();
    let draft = draft?;

    let store = open_history(config);
    let record = pipeline::accept(draft, &prepared.inputs, Utc::now(), &store)?;

    println!(
        "\n📊 {} for {}: {}",
        record.project_name,
        record.grant_name,
        record.display_total()
    );

    export(args, config, &record)
}

/// Handle --dry-run: print detected categories and the assembled prompt.
fn handle_dry_run(prepared: &pipeline::PreparedEvaluation) -> Result<()> {
    println!("\n🔍 Dry run: no evaluator call will be made.\n");

    if prepared.categories.is_empty() {
        println!("   No additional evaluation dimensions detected.");
    } else {
        println!("   Additional evaluation dimensions:");
        for category in &prepared.categories {
            println!("     + {} - {}", category.name, category.description);
        }
    }

    println!("\n--- Prompt ({} bytes) ---\n", prepared.prompt.len());
    println!("{}", prepared.prompt);
    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(())
}

/// Write the record in the requested format.
fn export(args: &Args, config: &Config, record: &EvaluationRecord) -> Result<()> {
    let path = match args.format {
        OutputFormat::Pdf => {
            let engine = LayoutEngine::new(RenderOptions {
                title: config.report.title.clone(),
                generated_on: Utc::now().date_naive(),
            });
            let doc = engine.render(record)?;

            let path = report::resolve_output_path(
                args.output.as_deref(),
                &config.general.output_dir,
                doc.suggested_filename(),
            );
            report::write_pdf_report(&doc, &path)?;
            info!(pages = doc.page_count(), "PDF report written");
            path
        }
        OutputFormat::Json => {
            record.validate()?;
            let filename = report::json_filename(&suggested_filename(&record.project_name));
            let path = report::resolve_output_path(
                args.output.as_deref(),
                &config.general.output_dir,
                &filename,
            );
            report::write_json_report(record, &path)?;
            path
        }
    };

    println!("\n✅ Report saved to: {}", path.display());
    Ok(())
}

fn open_history(config: &Config) -> HistoryStore {
    let backend = FileStore::new(config.history_dir());
    debug!(path = %backend.dir().display(), "Opening evaluation history");
    HistoryStore::open(Box::new(backend), config.history.key.clone())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load a structured record for --input. A complete stored record is used
/// as is; anything looser goes through draft validation with a fresh
/// timestamp.
fn load_record(path: &Path) -> Result<EvaluationRecord> {
    let content = read_input(path)?;

    match serde_json::from_str::<EvaluationRecord>(&content) {
        Ok(record) => Ok(record),
        Err(e) => {
            debug!("Not a complete record ({}), decoding as a draft", e);
            let draft: EvaluationDraft = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(draft.into_record(&EvaluationInputs::default(), Utc::now())?)
        }
    }
}

fn spinner(args: &Args, message: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    match ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        Ok(style) => pb.set_style(style),
        Err(e) => warn!("Invalid progress template: {}", e),
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// A user-facing message for the first classified error in the chain.
fn describe_error(e: &anyhow::Error) -> String {
    for cause in e.chain() {
        if let Some(upstream) = cause.downcast_ref::<UpstreamError>() {
            let hint = match upstream {
                UpstreamError::Connectivity(_) => "Check your network connection and --api-url.",
                UpstreamError::Authentication | UpstreamError::MissingApiKey(_) => {
                    "Check that your API key is set and valid."
                }
                UpstreamError::RateLimited => "Wait a moment and try again.",
                UpstreamError::MalformedResponse(_) => {
                    "The model did not return a usable evaluation, try again or pick another model."
                }
                UpstreamError::Service { .. } => "The evaluator service reported an error.",
            };
            return format!("Evaluator error ({}): {}\n   {}", upstream.kind(), upstream, hint);
        }
        if let Some(invalid) = cause.downcast_ref::<ValidationError>() {
            return format!("Invalid evaluation: {}", invalid);
        }
        if let Some(report) = cause.downcast_ref::<ReportError>() {
            return format!("Could not build the report: {}", report);
        }
        if let Some(history) = cause.downcast_ref::<HistoryError>() {
            return format!("{}. Run with --history to list saved evaluations.", history);
        }
    }
    format!("Error: {:#}", e)
}
