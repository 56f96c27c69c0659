//! Runs one report query from the command line and writes the artifact to disk.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use company_intel::aggregate::SourceStatusView;
use company_intel::bootstrap::ReportRuntime;
use company_intel::config::{credentials, PipelineConfig};
use company_intel::error::PipelineError;
use company_intel::render::ReportFormat;
use company_intel::telemetry;

#[derive(Parser, Debug)]
#[command(name = "company-report", about = "Generate a company intelligence report")]
struct Args {
    /// Company name or search phrase
    query: String,

    /// Output format (text or pdf); defaults to the configured format
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Directory the report is written to; defaults to the configured output_dir
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Pipeline config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load_from(path)?,
        None => PipelineConfig::load_default()?,
    };
    let format = args.format.unwrap_or(config.report.default_format);
    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| config.report.output_dir.clone());

    let runtime = ReportRuntime::build(config, credentials::init_global())
        .context("building report runtime")?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            on_ctrl_c.cancel();
        }
    });

    match runtime.orchestrator().run(&args.query, format, &cancel).await {
        Ok(outcome) => {
            let path = outcome.artifact.write_to(&out_dir)?;
            for s in &outcome.statuses {
                print_status(&SourceStatusView::from(s));
            }
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if let PipelineError::Cancelled { phase } = &failure.error {
                tracing::info!(phase = %phase, "run interrupted");
            }
            eprintln!("report failed during {}: {}", failure.phase, failure.error);
            for s in &failure.statuses {
                print_status(&SourceStatusView::from(s));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_status(s: &SourceStatusView) {
    match (&s.error, s.items) {
        (Some(err), _) => eprintln!("  {:<12} failed: {err}", s.source),
        (None, Some(n)) => eprintln!("  {:<12} ok ({n} items)", s.source),
        (None, None) => eprintln!("  {:<12} ok", s.source),
    }
}
