use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octofhir-ingest")]
#[command(about = "Load NDJSON files into a FHIR server through $import, in dependency order")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "OCTOFHIR_INGEST_CONFIG")]
    pub config: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the data directory and import every batch (default)
    Run,
    /// Print the batch plan without contacting the FHIR server
    Plan(PlanArgs),
    /// Only serve the data directory until Ctrl+C
    Serve,
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args)]
pub struct PlanArgs {
    /// Output format
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,
}
