// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SubVision - queue-driven image generation with a live relay.
//!
//! This is the binary entry point. `worker` runs stage 1, `relay` runs
//! stage 2, and `serve` runs both in one process over a shared queue.

mod enqueue;
mod relay;
mod shutdown;
mod status;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// SubVision - queue-driven image generation with a live relay.
#[derive(Parser, Debug)]
#[command(name = "subvision", version, about, long_about = None)]
struct Cli {
    /// Explicit configuration file (environment overrides still apply).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Consume the jobs queue and generate images.
    Worker,
    /// Drain the ready queue to WebSocket clients and serve the web API.
    Relay,
    /// Run the worker and the relay in one process.
    Serve,
    /// Publish a job message to the jobs queue.
    Enqueue(enqueue::EnqueueArgs),
    /// Print queue depths.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => subvision_config::load_and_validate_path(path),
        None => subvision_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            subvision_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Worker => worker::run_worker(&config, shutdown::install_signal_handler()).await,
        Commands::Relay => relay::run_relay(&config, shutdown::install_signal_handler()).await,
        Commands::Serve => relay::run_serve(&config, shutdown::install_signal_handler()).await,
        Commands::Enqueue(args) => enqueue::run_enqueue(&config, args).await,
        Commands::Status => status::run_status(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "subvision exited with error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so `enqueue` and `status` output stays clean on stdout.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("subvision={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
