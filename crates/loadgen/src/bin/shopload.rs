//! Shopload CLI
//!
//! A command-line tool for driving virtual-user load against the shop API.

use clap::{Parser, Subcommand};
use shopload_loadgen::{LoadConfig, LoadRunner};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shopload")]
#[command(about = "Virtual-user load generator for the shop API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as TOML
    InitConfig,

    /// Run virtual users against the API
    Run {
        /// TOML configuration file (flags below override it)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base URL of the API under test
        #[arg(short, long)]
        base_url: Option<String>,

        /// Number of virtual users
        #[arg(short, long)]
        users: Option<usize>,

        /// Users started per second
        #[arg(long)]
        spawn_rate: Option<f64>,

        /// Duration to run (e.g., "30s", "5m", "1h")
        #[arg(short, long, default_value = "60s")]
        duration: humantime::Duration,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Username prefix for virtual users (`<prefix><n>`)
        #[arg(long)]
        identity_prefix: Option<String>,

        /// Wait for the API to be reachable before starting
        #[arg(long)]
        wait_ready: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::InitConfig => {
            // No tracing here - output goes to stdout
            print!("{}", LoadConfig::default().to_toml()?);
        }

        Commands::Run {
            config,
            base_url,
            users,
            spawn_rate,
            duration,
            seed,
            identity_prefix,
            wait_ready,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let mut config = match config {
                Some(path) => LoadConfig::from_file(path)?,
                None => LoadConfig::default(),
            };
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(users) = users {
                config.users = users;
            }
            if let Some(rate) = spawn_rate {
                config.spawn_rate = rate;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(prefix) = identity_prefix {
                config = config.with_identity_prefix(prefix);
            }

            let runner = LoadRunner::new(config)?;

            if wait_ready {
                info!("Waiting for API to be ready...");
                runner.wait_for_ready(Duration::from_secs(60)).await?;
                info!("API ready.");
            }

            let stop = CancellationToken::new();
            {
                let stop = stop.clone();
                let duration = *duration;
                tokio::spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {}
                        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping users"),
                    }
                    stop.cancel();
                });
            }

            info!(duration = ?*duration, "Starting load run");
            let report = runner.run_until(stop).await;
            report.print();
        }
    }

    Ok(())
}
