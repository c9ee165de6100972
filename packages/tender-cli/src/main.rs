//! Tender extraction CLI
//!
//! Runs one tender document through the extraction pipeline and prints
//! the validated record with its warnings.

mod config;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde_json::Value;
use tender_extraction::ai::{OpenAI, RateLimitedCompletion};
use tender_extraction::{ExtractionRecord, Pipeline, PipelineInput, Severity};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "tender", about = "Extract and validate a food-service tender document")]
struct Args {
    /// Plain-text tender document
    document: PathBuf,

    /// Original file name, used for document-type classification
    #[arg(long)]
    filename: Option<String>,

    /// Cost-table analysis JSON files to merge into the record
    #[arg(long = "cost-table")]
    cost_tables: Vec<PathBuf>,

    /// Skip the qualitative contextual analysis
    #[arg(long)]
    no_analysis: bool,

    /// Print the record as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tender_extraction=debug".into()),
        )
        .with(fmt::layer().with_target(true).with_line_number(true))
        .init();

    let args = Args::parse();
    let config = CliConfig::from_env()?;

    let mut openai = OpenAI::new(config.openai_api_key.clone());
    if let Some(model) = &config.openai_model {
        openai = openai.with_model(model.clone());
    }
    if let Some(url) = &config.openai_base_url {
        openai = openai.with_base_url(url.clone());
    }
    let completion = RateLimitedCompletion::per_minute(openai, config.requests_per_minute);

    let pipeline_config = config
        .pipeline
        .clone()
        .with_contextual_analysis(!args.no_analysis);
    let pipeline = Pipeline::with_config(completion, pipeline_config);

    let input = build_input(&args)?;
    let record = pipeline
        .run(input)
        .await
        .context("Failed to extract tender record")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }

    if record.has_errors() {
        std::process::exit(2);
    }
    Ok(())
}

fn build_input(args: &Args) -> Result<PipelineInput> {
    let text = fs::read_to_string(&args.document)
        .with_context(|| format!("Failed to read {}", args.document.display()))?;

    let filename = args.filename.clone().or_else(|| {
        args.document
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });

    let mut input = PipelineInput::new(text);
    if let Some(filename) = filename {
        input = input.with_filename(filename);
    }

    for path in &args.cost_tables {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let analysis: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        input = input.with_cost_table(analysis);
    }

    info!(
        document = %args.document.display(),
        cost_tables = args.cost_tables.len(),
        "processing tender document"
    );
    Ok(input)
}

fn print_record(record: &ExtractionRecord) {
    println!("{}", "Tender record".bright_cyan().bold());
    println!("  hash:        {}", record.content_hash.dimmed());
    println!(
        "  document:    {} ({:.2})",
        record.document.doc_type, record.document.confidence
    );
    field("institution", record.institution.as_deref());
    field("tender type", record.tender_type.as_deref());
    field("headcount", record.headcount.map(|v| v.to_string()).as_deref());
    field("staff", record.staff_count.map(|v| v.to_string()).as_deref());
    field("meals/day", record.meals_per_day.map(|v| v.to_string()).as_deref());
    field("days", record.days.map(|v| v.to_string()).as_deref());
    field("budget", record.budget.map(|v| format!("{v:.2} TL")).as_deref());
    println!("  confidence:  {:.2}", record.confidence);

    if let Some(financial) = &record.financial {
        println!();
        println!("{}", "Financial".bright_cyan().bold());
        if let Some(price) = financial.unit_price {
            println!("  unit price:  {price:.2} TL");
        }
        if let Some(margin) = financial.profit_margin_percent {
            println!("  margin:      %{margin}");
        }
        println!("  protein:     {:?}", financial.protein_dependency_risk);
        if let Some(verdict) = financial.verdict {
            println!("  verdict:     {verdict:?}");
        }
        println!("  {}", financial.rationale);
        if let Some(warning) = &financial.threshold_warning {
            println!("  {}", warning.yellow());
        }
    }

    if let Some(analysis) = &record.contextual_analysis {
        println!();
        println!("{}", "Analysis".bright_cyan().bold());
        println!("  risk:        {:?}", analysis.operational_risks.level);
        println!("  deviation:   %{}", analysis.cost_deviation.rate);
        println!("  schedule:    {:?}", analysis.schedule.status);
        if !analysis.recommendation.is_empty() {
            println!("  {}", analysis.recommendation);
        }
    }

    if !record.warnings.is_empty() {
        println!();
        println!("{}", "Warnings".bright_cyan().bold());
        for warning in &record.warnings {
            let tag = match warning.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warn".yellow().bold(),
                Severity::Info => "info".blue(),
            };
            let fixed = if warning.auto_fixed { " (fixed)" } else { "" };
            println!("  {tag} {}: {}{}", warning.field, warning.message, fixed.green());
        }
    }
}

fn field(label: &str, value: Option<&str>) {
    match value {
        Some(value) => println!("  {:<12} {}", format!("{label}:"), value),
        None => println!("  {:<12} {}", format!("{label}:"), "-".dimmed()),
    }
}
