//! HATB Auto Trading Bot - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// HATB signal-driven auto trading bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HATB_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    hatb_telemetry::init_logging()?;

    info!("Starting HATB Bot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > HATB_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("HATB_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = hatb_bot::AppConfig::load(&config_path)?;
    info!(
        port = config.gateway.port,
        store = ?config.store.kind,
        execution = ?config.execution.mode,
        "Configuration loaded"
    );

    let app = hatb_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
