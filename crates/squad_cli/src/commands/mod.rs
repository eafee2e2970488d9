//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod generate;
pub mod version;

/// squad - a software team of LLM roles
#[derive(Parser)]
#[command(name = "squad")]
#[command(version, about = "squad - generate projects with a team of LLM roles")]
#[command(long_about = r#"
squad runs a fixed team (Project Manager, Architect, Tech Lead, Developer,
QA Engineer) over a requirements document and writes the resulting
artifacts into an output directory.

WORKFLOW:
  requirements analysis → architecture review → development cycle
  → integration review → (work planning → development cycle)* → done

EXIT CODES:
  0 - Run finished successfully
  1 - Run failed
  2 - Configuration error before the run started
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a project from a requirements file
    Generate(generate::GenerateArgs),

    /// Show version information
    Version,
}
