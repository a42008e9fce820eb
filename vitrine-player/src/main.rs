mod api_client;
mod cache;
mod config;
mod refresh_loop;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api_client::ApiClient;
use crate::cache::ManifestCache;
use crate::config::Config;
use crate::refresh_loop::RefreshLoop;

#[derive(Parser)]
#[command(version, author = "VITRINE AUTHORS", about = "Vitrine Player\nSignage playback client", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| "player-config.toml".to_string());

    if std::fs::metadata(&config_path).is_err() {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    }

    let config = Config::load(&config_path)?;
    tracing::info!("Loaded configuration from {}", config_path);

    let client = ApiClient::new(&config)?;
    let cache = ManifestCache::new(config.cache_path.clone());

    RefreshLoop::new(config, client, cache).run().await
}
