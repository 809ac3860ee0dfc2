mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flowbench",
    version,
    about = "Run deterministic staged data pipelines and inspect their artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample pipeline definition
    Init {
        /// Directory to write the sample into
        #[arg(long, default_value = "pipeline_examples")]
        dir: PathBuf,
    },
    /// Run a pipeline and save its artifact
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Number of events the source generates
        #[arg(long, default_value_t = 1000)]
        max_events: usize,
        /// Directory for run artifacts
        #[arg(long, default_value = "runs")]
        runs_dir: PathBuf,
    },
    /// Print a saved run artifact
    Report {
        /// Path to a run JSON artifact
        run: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Init { dir } => {
            commands::init::execute(&dir)?;
            Ok(())
        }
        Commands::Run {
            pipeline,
            max_events,
            runs_dir,
        } => {
            commands::run::execute(&pipeline, max_events, &runs_dir).await?;
            Ok(())
        }
        Commands::Report { run } => commands::report::execute(&run),
    }
}
