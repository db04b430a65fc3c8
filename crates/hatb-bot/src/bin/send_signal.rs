//! Smoke client: post one signal to a running gateway.
//!
//! ```text
//! send-signal --symbol BTCUSD --action BUY --price 50000
//! send-signal --symbol ETHUSD --action SELL --header
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(version, about = "Send a test webhook signal to the HATB gateway")]
struct Args {
    /// Gateway base URL
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,

    #[arg(long, default_value = "BTCUSD")]
    symbol: String,

    /// BUY or SELL
    #[arg(long, default_value = "BUY")]
    action: String,

    #[arg(long)]
    price: Option<f64>,

    /// Shared secret (defaults to HATB_WEBHOOK_SECRET, then the built-in default)
    #[arg(long)]
    secret: Option<String>,

    /// Send the secret in the X-TradingView-Token header instead of the body
    #[arg(long)]
    header: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let secret = args
        .secret
        .or_else(|| std::env::var("HATB_WEBHOOK_SECRET").ok())
        .unwrap_or_else(|| "DEFAULT_SECRET_KEY".to_string());

    let mut body = json!({
        "symbol": args.symbol,
        "action": args.action,
        "price": args.price,
    });
    let url = format!("{}/webhook/tradingview", args.url.trim_end_matches('/'));
    let mut request = reqwest::Client::new().post(&url);
    if args.header {
        request = request.header("X-TradingView-Token", &secret);
    } else {
        body["secret"] = json!(secret);
    }

    let response = request
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;
    let status = response.status();
    let text = response.text().await.context("read response body")?;

    println!("{status} {text}");
    if !status.is_success() {
        anyhow::bail!("gateway answered {status}");
    }
    Ok(())
}
