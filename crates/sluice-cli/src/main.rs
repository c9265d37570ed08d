mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::error;
use sluice_common::config::AppConfig;
use sluice_telemetry::telemetry::{init_telemetry, shutdown_telemetry};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Run source queries and write the results as Parquet files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the queries of all sources and write the outputs
    Build {
        /// The directory containing one subdirectory per source (overrides `paths.sources`)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// The output directory (overrides `paths.output`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only execute the sources with the given names
        #[arg(long = "source")]
        only: Vec<String>,
    },
    /// List the discovered sources
    List {
        /// The directory containing one subdirectory per source (overrides `paths.sources`)
        #[arg(long)]
        sources: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_telemetry(&config.telemetry)?;

    let result = match cli.command {
        Commands::Build {
            sources,
            output,
            only,
        } => {
            let sources = sources.unwrap_or_else(|| config.paths.sources.clone());
            let output = output.unwrap_or_else(|| config.paths.output.clone());
            runner::build(&config, &sources, &output, &only).await
        }
        Commands::List { sources } => {
            let sources = sources.unwrap_or_else(|| config.paths.sources.clone());
            runner::list(&sources)
        }
    };
    if let Err(e) = &result {
        error!("{e}");
    }

    shutdown_telemetry();
    Ok(result?)
}
