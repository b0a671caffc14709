use clap::Parser;
use colored::Colorize;

use octofhir_ingest::cli::{Cli, Commands};
use octofhir_ingest::config::loader::load_config;
use octofhir_ingest::output::print_error;
use octofhir_ingest::{commands, observability};

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let cli = Cli::parse();
    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        fhir_server = %cfg.fhir_server_url,
        "Configuration loaded"
    );

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&cfg).await,
        Commands::Plan(args) => commands::plan::plan(&cfg, args.format),
        Commands::Serve => commands::serve::serve(&cfg).await,
        Commands::Config => print_config(&cfg),
    };

    if let Err(e) = result {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn print_config(cfg: &octofhir_ingest::IngestConfig) -> anyhow::Result<()> {
    println!("{}", "# effective configuration".dimmed());
    println!("{}", toml::to_string_pretty(cfg)?);
    println!("{}: {}", "Manifest base URL".cyan(), cfg.manifest_base_url());
    Ok(())
}
