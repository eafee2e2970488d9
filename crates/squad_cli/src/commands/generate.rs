//! Generate command - Run the team on a requirements document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{error, info, warn};

use squad_agents::assemble_team;
use squad_core::{
    ArtifactStore, FsWorkspace, GatewayClient, ProjectBrief, Workspace, WorkflowEngine,
};

use crate::config::AppConfig;
use crate::spec_file::{parse_spec, SpecFormat};
use crate::summary;

#[derive(Args)]
pub struct GenerateArgs {
    /// File containing the project requirements
    prompt_file: PathBuf,

    /// Structured spec file (.yaml, .yml or Markdown)
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Directory the project is generated into
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Configuration file (defaults to ./squad.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Override the attempts allowed per work item
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

/// Run the workflow. Errors are configuration problems found before the run
/// starts; the returned code reflects how the run ended.
pub async fn execute(args: GenerateArgs) -> Result<u8> {
    let requirements = load_prompt(&args.prompt_file)?;
    let spec = match &args.spec {
        Some(path) => load_spec(path)?,
        None => serde_json::Value::Null,
    };

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.engine.max_attempts = max_attempts;
    }
    config.validate()?;

    std::fs::create_dir_all(&args.output).with_context(|| {
        format!("Failed to create output directory {}", args.output.display())
    })?;
    let workspace = Arc::new(FsWorkspace::new(&args.output));
    workspace
        .create_layout()
        .context("Failed to prepare workspace layout")?;
    let store = Arc::new(ArtifactStore::with_workspace(workspace));

    let gateway = squad_llm::connect(&config.llm)
        .await
        .context("Failed to connect to the LLM provider")?;
    let client = Arc::new(GatewayClient::new(
        gateway,
        config.engine.max_concurrent_requests,
        config.engine.retry_policy(),
    ));
    let team = assemble_team(client, store.clone(), config.llm.max_tokens);

    let engine = WorkflowEngine::new(team, store, config.engine.clone())
        .context("Failed to build workflow engine")?
        .with_journal(&args.output);

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    if !args.json {
        println!("🚀 Starting project generation");
        println!("   Output: {}", args.output.display());
        println!("   Provider: {}", config.llm.provider);
    }
    info!(
        "Generating into {} with {} workers",
        args.output.display(),
        config.engine.workers
    );

    let mut brief = ProjectBrief::new(requirements);
    if !spec.is_null() {
        brief = brief.with_spec(spec);
    }
    let report = engine.run(brief).await;

    // The run is over: nothing below may change the exit code
    let run_summary = report.summary();
    let journal_dir = report.journal_dir.as_deref();
    if args.json {
        println!(
            "{}",
            json_or_text(&run_summary, || summary::render(&run_summary, journal_dir))
        );
    } else {
        println!();
        print!("{}", summary::render(&run_summary, journal_dir));
    }

    Ok(report.exit_code())
}

/// Pretty JSON for `value`, or the `fallback` text if it cannot be serialized.
fn json_or_text<T: Serialize>(value: &T, fallback: impl FnOnce() -> String) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize run summary: {}", e);
            fallback()
        }
    }
}

fn load_prompt(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
    let content = content.trim();
    if content.is_empty() {
        anyhow::bail!("Prompt file {} is empty", path.display());
    }
    Ok(content.to_string())
}

fn load_spec(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    let format = SpecFormat::from_path(path);
    parse_spec(&content, format)
        .with_context(|| format!("Failed to parse spec file {}", path.display()))
}
