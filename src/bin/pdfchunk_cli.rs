//! Command-line access to the PDF pipeline, documentation lookup, and Claude Desktop setup.
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use pdfchunk::{
    claude_desktop::{self, McpServerEntry},
    config, logging,
    processing::PdfService,
};
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "pdfchunk-cli",
    about = "Summarize PDFs and query documentation from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the documentation index a question.
    Docs { query: String },
    /// Summarize a local PDF and print where the summary was written.
    Process { file_path: PathBuf },
    /// Fetch a job's status from the running back end.
    Status { job_id: String },
    /// Generate a Claude Desktop entry for the MCP server.
    ClaudeConfig {
        /// Write a standalone config to this path.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Merge into an existing Claude Desktop config, backing it up first.
        #[arg(long)]
        install: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing(logging::ConsoleOutput::Stderr);

    match cli.command {
        Command::Docs { query } => docs(&query).await,
        Command::Process { file_path } => process(file_path).await,
        Command::Status { job_id } => status(&job_id).await,
        Command::ClaudeConfig { output, install } => claude_config(output, install),
    }
}

fn service() -> Result<PdfService> {
    PdfService::from_config(config::get_config()).context("failed to build PDF service")
}

async fn docs(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    let answer = service()?.query_documentation(query).await;
    println!("{answer}");
    if answer.starts_with("Error:") {
        bail!("documentation query failed");
    }
    Ok(())
}

async fn process(file_path: PathBuf) -> Result<()> {
    let service = service()?;
    service
        .ensure_directories()
        .await
        .context("failed to create working directories")?;
    let processed = service
        .process_file(&file_path)
        .await
        .with_context(|| format!("failed to process {}", file_path.display()))?;

    let report = &processed.report;
    println!("Job:            {}", processed.job_id);
    println!("Input:          {}", report.input_pdf.display());
    println!("Extracted text: {} chars", report.extracted_text_length);
    println!("Chunks:         {}", report.num_chunks);
    println!("Summary:        {} chars", report.summary_length);
    println!("Output:         {}", report.output_pdf.display());
    Ok(())
}

async fn status(job_id: &str) -> Result<()> {
    let backend = config::get_config().backend_url.trim_end_matches('/');
    let url = format!("{backend}/pdf/status/{job_id}");
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach back end at {backend}"))?;

    let code = response.status();
    let body: Value = response
        .json()
        .await
        .context("back end returned a non-JSON response")?;
    if !code.is_success() {
        let detail = body
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(anyhow!("{code}: {detail}"));
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn claude_config(output: Option<PathBuf>, install: Option<PathBuf>) -> Result<()> {
    let entry =
        McpServerEntry::for_current_install().context("failed to locate the MCP server binary")?;
    let config = claude_desktop::standalone_config(&entry);

    if let Some(path) = &output {
        claude_desktop::write_json(path, &config)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &install {
        match claude_desktop::install(path, &entry)? {
            Some(backup) => println!(
                "Updated {} (previous version saved to {})",
                path.display(),
                backup.display()
            ),
            None => println!("Created {}", path.display()),
        }
    }
    if output.is_none() && install.is_none() {
        println!("{}", serde_json::to_string_pretty(&config)?);
        if let Some(default) = claude_desktop::default_config_path() {
            eprintln!(
                "Pass --install {} to add this server to Claude Desktop.",
                default.display()
            );
        }
    }
    Ok(())
}
