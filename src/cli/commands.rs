//! CLI command definitions for ticket-forge.
//!
//! `generate` produces a synthetic IT support ticket dataset with an LLM;
//! `check` re-validates an existing dataset file.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::{LiteLlmClient, LlmProvider, OpenRouterProvider};
use crate::pipeline::config::DEFAULT_OUTPUT_PATH;
use crate::pipeline::{ForgeConfig, TicketPipeline};
use crate::tickets::check_dataset;

/// Synthetic IT support ticket dataset generator.
#[derive(Parser)]
#[command(name = "ticket-forge")]
#[command(about = "Generate synthetic IT support ticket datasets with an LLM")]
#[command(version)]
#[command(
    long_about = "ticket-forge asks an LLM for batches of IT support tickets, keeps the lines that match\nthe ticket format, makes ticket ids unique and appends them to a text file.\n\nExample usage:\n  ticket-forge generate --count 500 --output ./data/generated_tickets.txt"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a ticket dataset.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Check an existing dataset for malformed lines and duplicate ids.
    Check(CheckArgs),
}

/// Arguments for the generate command.
///
/// Flags override values from `--config` and `TICKET_FORGE_*` variables.
#[derive(Parser, Debug, Default)]
pub struct GenerateArgs {
    /// Number of tickets to generate.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Tickets requested per LLM call.
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Output file (truncated at start).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// LLM model to use for generation (OpenRouter format).
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Centre of the ticket creation date window (YYYY-MM-DD).
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,

    /// Days on either side of the reference date.
    #[arg(long)]
    pub date_range_days: Option<u32>,

    /// First id probed when a duplicate id must be replaced.
    #[arg(long)]
    pub fallback_start: Option<u64>,

    /// Give up after this many consecutive failed batches (default: retry forever).
    #[arg(long)]
    pub max_failures: Option<u32>,

    /// YAML configuration file.
    #[arg(short = 'c', long, env = "TICKET_FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY or LITELLM_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output the run summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the check command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Dataset file to check.
    #[arg(short = 'i', long, default_value = DEFAULT_OUTPUT_PATH)]
    pub input: PathBuf,

    /// Output the report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Check(args) => run_check_command(args),
    }
}

/// Layers configuration: file (or defaults), then environment, then flags.
fn resolve_config(args: &GenerateArgs) -> anyhow::Result<ForgeConfig> {
    let base = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            ForgeConfig::from_yaml_file(path)?
        }
        None => ForgeConfig::default(),
    };

    let mut config = base.with_env_overrides()?;

    if let Some(count) = args.count {
        config = config.with_target_count(count);
    }
    if let Some(size) = args.batch_size {
        config = config.with_batch_size(size);
    }
    if let Some(output) = &args.output {
        config = config.with_output_path(output.clone());
    }
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    if let Some(temperature) = args.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(date) = args.reference_date {
        config = config.with_reference_date(date);
    }
    if let Some(days) = args.date_range_days {
        config = config.with_date_range_days(days);
    }
    if let Some(start) = args.fallback_start {
        config = config.with_fallback_start_id(start);
    }
    if let Some(max) = args.max_failures {
        config = config.with_max_consecutive_failures(Some(max));
    }

    config.validate()?;
    Ok(config)
}

fn build_llm_client(
    api_key: Option<String>,
    model: &str,
) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let api_key = api_key.filter(|key| !key.trim().is_empty());

    if let Some(key) = api_key {
        let provider = OpenRouterProvider::with_model(key, model.to_string())?;
        info!(
            model = %model,
            key = %provider.api_key_masked(),
            "Using OpenRouter with specified API key"
        );
        return Ok(Arc::new(provider));
    }

    if std::env::var("LITELLM_API_BASE").is_err() {
        if let Ok(key) = std::env::var("LITELLM_API_KEY") {
            let provider = OpenRouterProvider::with_model(key, model.to_string())?;
            info!(
                model = %model,
                key = %provider.api_key_masked(),
                "Using OpenRouter with LITELLM_API_KEY"
            );
            return Ok(Arc::new(provider));
        }
    }

    info!("Using LiteLLM client from environment");
    let client = LiteLlmClient::from_env().map_err(|e| {
        anyhow::anyhow!(
            "Failed to initialize LLM client: {}. Please provide --api-key or set \
             OPENROUTER_API_KEY/LITELLM_API_KEY env var.",
            e
        )
    })?;
    Ok(Arc::new(client))
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let llm_client = build_llm_client(args.api_key.clone(), &config.model)?;

    if config.max_consecutive_failures.is_none() {
        info!("No failure ceiling configured; failed batches are retried indefinitely");
    }

    let pipeline = TicketPipeline::new(llm_client, config);
    let summary = pipeline.run().await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&summary)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("✓ Ticket generation completed");
    println!("  Output file: {}", summary.output_path);
    println!(
        "  Tickets: {} written (target {})",
        summary.accepted, summary.target
    );
    println!(
        "  Batches: {} requested, {} failed",
        summary.stats.batches_requested, summary.stats.batches_failed
    );
    println!(
        "  Lines: {} malformed, {} ids reassigned",
        summary.stats.malformed_lines, summary.stats.reassigned_ids
    );
    println!("  Duration: {:.1}s", summary.duration_ms as f64 / 1000.0);
    Ok(())
}

fn run_check_command(args: CheckArgs) -> anyhow::Result<()> {
    let report = check_dataset(&args.input)?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        println!("Dataset: {}", args.input.display());
        println!("  Lines:      {}", report.total_lines);
        println!("  Valid:      {}", report.valid);
        println!("  Malformed:  {}", report.malformed_lines.len());
        println!("  Duplicates: {}", report.duplicate_ids.len());
        for line_no in report.malformed_lines.iter().take(20) {
            println!("    malformed line {}", line_no);
        }
        for (id, count) in report.duplicate_ids.iter().take(20) {
            println!("    id {} appears {} times", id, count);
        }
    }

    if !report.is_clean() {
        warn!(path = %args.input.display(), "Dataset check found problems");
        anyhow::bail!(
            "{} malformed lines and {} duplicate ids in {}",
            report.malformed_lines.len(),
            report.duplicate_ids.len(),
            args.input.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "ticket-forge",
            "generate",
            "-n",
            "50",
            "--batch-size",
            "10",
            "--reference-date",
            "2024-02-29",
            "--max-failures",
            "5",
            "--json",
        ])
        .expect("valid args");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.count, Some(50));
                assert_eq!(args.batch_size, Some(10));
                assert_eq!(args.reference_date, NaiveDate::from_ymd_opt(2024, 2, 29));
                assert_eq!(args.max_failures, Some(5));
                assert!(args.json);
            }
            Commands::Check(_) => panic!("expected generate"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_check_defaults() {
        let cli = Cli::try_parse_from(["ticket-forge", "check"]).expect("valid args");
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.input, PathBuf::from(DEFAULT_OUTPUT_PATH));
                assert!(!args.json);
            }
            Commands::Generate(_) => panic!("expected check"),
        }
    }

    #[test]
    fn test_invalid_reference_date_rejected() {
        let result = Cli::try_parse_from([
            "ticket-forge",
            "generate",
            "--reference-date",
            "2025-13-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("forge.yaml");
        std::fs::write(&path, "target_count: 20\nbatch_size: 4\n").expect("write config");

        let args = GenerateArgs {
            config: Some(path),
            batch_size: Some(8),
            max_failures: Some(2),
            ..GenerateArgs::default()
        };
        let config = resolve_config(&args).expect("valid config");

        assert_eq!(config.batch_size, 8);
        assert_eq!(config.max_consecutive_failures, Some(2));
    }

    #[test]
    fn test_resolve_config_validates() {
        let args = GenerateArgs {
            count: Some(0),
            ..GenerateArgs::default()
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_check_command_fails_on_duplicates() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("tickets.txt");
        std::fs::write(
            &path,
            "Ticket #12345: A. - Status: New - Created: 2025-01-01\n\
             Ticket #12345: B. - Status: New - Created: 2025-01-02\n",
        )
        .expect("seed");

        let result = run_check_command(CheckArgs {
            input: path,
            json: true,
        });
        assert!(result.is_err());
    }
}
