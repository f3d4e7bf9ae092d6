use std::path::PathBuf;

use clap::{Parser, Subcommand};
use splitgrid_core::SchedulerConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "splitgrid",
    about = "SplitGrid — worker-local split-aware task scheduler",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to splitgrid.toml (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON event script and print each decision as a JSON line.
    ///
    /// The script is an array of events tagged by "op": stage, validate,
    /// dispatch, complete, reserve_persist, complete_persist, delete,
    /// grow_pool, report_memory.
    Replay {
        /// Event script ("-" reads stdin)
        #[arg(short, long)]
        events: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)?,
        None => SchedulerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match cli.command {
        Commands::Replay { events } => commands::replay::replay(&config, &events),
        Commands::Config => commands::config::show(&config),
    }
}
