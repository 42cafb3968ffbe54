//! Roulette Table Binary
//!
//! One binary for every process of the deployment: the live table, the
//! settlement service, the RNG service, plus offline tooling.

use clap::{Parser, Subcommand};
use roulette_table::{
    api::{ApiServer, ServiceMode},
    config::{generate_sample_config, ConfigLoader},
    games::rtp::{self, RtpConfig},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "roulette-table")]
#[command(about = "Live roulette table", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<String>,

    /// Listen port (overrides the configuration)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the live table over WebSocket
    Table,
    /// Serve POST /settle for remote tables
    Settlement,
    /// Serve raw random values on GET /rng
    Rng,
    /// Measure return-to-player by simulation
    Rtp {
        /// Spins per bet type
        #[arg(long, default_value_t = 1_000_000)]
        spins: u64,

        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a sample configuration file
    InitConfig {
        #[arg(default_value = "roulette.toml")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roulette_table=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mode = match args.command {
        Command::Table => ServiceMode::Table,
        Command::Settlement => ServiceMode::Settlement,
        Command::Rng => ServiceMode::Rng,
        Command::Rtp { spins, workers, seed } => {
            let config = RtpConfig {
                spins_per_bet: spins,
                workers,
                seed,
                ..RtpConfig::default()
            };
            info!("🎰 Running RTP simulation: {} spins per bet on {} workers", spins, workers);
            let report = tokio::task::spawn_blocking(move || rtp::run(&config)).await??;

            for (bet_type, totals) in &report.per_bet {
                info!(
                    "   {:<10} RTP {:.4}  ({} wins / {} spins)",
                    bet_type.to_string(),
                    totals.rtp(),
                    totals.wins,
                    totals.spins
                );
            }
            return Ok(());
        }
        Command::InitConfig { path } => {
            generate_sample_config(&path)?;
            info!("📝 Sample configuration written to {}", path);
            return Ok(());
        }
    };

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(port) = args.port {
        config.server.port = port;
        loader.validate(&config)?;
    }

    ApiServer::new(config, mode).run().await
}
