mod api;
mod auth;
mod config;
mod db;
mod models;
mod schema;
mod services;
mod storage;

use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::config::Config;
use crate::db::DbPool;
use crate::storage::UrlSigner;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub signer: Arc<UrlSigner>,
}

#[derive(Parser)]
#[command(version, author = "VITRINE AUTHORS", about = "Vitrine Server\nDigital signage management", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

fn run_onboarding() -> Result<Config> {
    use dialoguer::{theme::ColorfulTheme, Input};

    println!("Welcome to Vitrine Server!");
    println!("It looks like you don't have a configuration file yet.");
    println!("Let's get you set up.\n");

    let host: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Host")
        .default("0.0.0.0".to_string())
        .interact_text()?;

    let port: u16 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Port")
        .default(8080)
        .interact_text()?;

    let db_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Database URL")
        .default("sqlite://vitrine.db".to_string())
        .interact_text()?;

    let storage_base: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Media storage base URL")
        .default("https://media.example.com/".to_string())
        .interact_text()?;

    // Fresh random secrets; the admin token is shown in the written file.
    let signing_secret = uuid::Uuid::new_v4().to_string();
    let admin_token = uuid::Uuid::new_v4().to_string();

    let config_content = format!(
        r#"[server]
host = "{}"
port = {}

[database]
url = "{}"

[storage]
base_url = "{}"
signing_secret = "{}"
url_ttl_secs = 3600

[admin]
api_token = "{}"

[logging]
level = "info"
"#,
        host, port, db_url, storage_base, signing_secret, admin_token
    );

    println!("\nGenerating configuration file: server-config.toml");
    std::fs::write("server-config.toml", &config_content)?;
    println!("Configuration saved successfully!");
    println!("----------------------------------------\n");

    let config: Config = toml::from_str(&config_content)?;
    Ok(config)
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
                .unwrap_or_else(|_| "vitrine_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| "server-config.toml".to_string());

    // First run without a config on an attended terminal: offer onboarding.
    if std::fs::metadata(&config_path).is_err() && cli.config.is_none() && console::user_attended()
    {
        if let Err(e) = run_onboarding() {
            eprintln!("Onboarding failed: {}", e);
            std::process::exit(1);
        }
    }

    let effective_config_path = if std::fs::metadata(&config_path).is_ok() {
        config_path
    } else if std::fs::metadata("server-config.toml").is_ok() {
        "server-config.toml".to_string()
    } else {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    };

    let config = Config::load(&effective_config_path)?;
    tracing::info!("Loaded configuration from {}", effective_config_path);

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    let mut migration_conn = db_pool.get()?;
    db::run_migrations(&mut migration_conn)?;
    tracing::info!("Database initialized");

    let base_url = Url::parse(&config.storage.base_url)
        .map_err(|e| anyhow::anyhow!("Invalid storage base_url: {}", e))?;
    let signer = UrlSigner::new(
        base_url,
        &config.storage.signing_secret,
        config.storage.url_ttl_secs,
    );

    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        signer: Arc::new(signer),
    };

    // Spawn screen presence monitor
    tokio::spawn(services::presence_monitor::run(state.clone()));

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    let app = Router::new()
        .nest("/api", api::routes(state.clone()))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {} (HTTP)", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
