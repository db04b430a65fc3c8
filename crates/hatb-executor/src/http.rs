//! Signed HTTP execution endpoint.
//!
//! Orders are POSTed as JSON to `{base_url}/orders`. Each request carries:
//! - `X-API-KEY`: the configured exchange API key
//! - `X-TIMESTAMP`: unix milliseconds at signing time
//! - `X-SIGNATURE`: hex HMAC-SHA256 of `timestamp + body` keyed by the secret

use chrono::Utc;
use hatb_core::{Credentials, Fill, OrderId, OrderRequest, Price, Size};
use hatb_store::BoxFuture;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::endpoint::ExecutionEndpoint;
use crate::error::{ExecutorError, ExecutorResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    client_order_id: &'a str,
    symbol: &'a str,
    side: &'a str,
    quantity: Decimal,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OrderStatus {
    Filled,
    Rejected,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    status: OrderStatus,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    quantity: Option<Decimal>,
    #[serde(default)]
    fee: Option<Decimal>,
    #[serde(default)]
    reason: Option<String>,
}

/// Execution endpoint that talks to a remote order API.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    orders_url: String,
}

impl HttpEndpoint {
    pub fn new(base_url: &str) -> ExecutorResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ExecutorError::Config(
                "endpoint_url is required for http execution".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder().build()?,
            orders_url: format!("{base_url}/orders"),
        })
    }

    async fn submit(&self, order: OrderRequest, credentials: &Credentials) -> ExecutorResult<Fill> {
        let client_order_id = OrderId::generate(order.signal_id, Utc::now());
        let body = serde_json::to_string(&OrderBody {
            client_order_id: client_order_id.as_str(),
            symbol: &order.symbol,
            side: order.side.as_str(),
            quantity: order.quantity.inner(),
            price: order.price_hint.inner(),
        })
        .map_err(|e| ExecutorError::Execution(format!("encode order: {e}")))?;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = sign(&credentials.secret_key, &timestamp, &body)?;

        debug!(
            signal_id = %order.signal_id,
            url = %self.orders_url,
            "Submitting order"
        );

        let response = self
            .client
            .post(&self.orders_url)
            .header("Content-Type", "application/json")
            .header("X-API-KEY", &credentials.api_key)
            .header("X-TIMESTAMP", &timestamp)
            .header("X-SIGNATURE", signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            warn!(signal_id = %order.signal_id, %status, "Order endpoint returned error status");
            return Err(ExecutorError::Execution(format!("HTTP {status}: {text}")));
        }

        let parsed: OrderResponse = serde_json::from_str(&text)
            .map_err(|e| ExecutorError::Execution(format!("decode response: {e}")))?;
        fill_from_response(parsed, &order, client_order_id)
    }
}

impl ExecutionEndpoint for HttpEndpoint {
    fn execute<'a>(
        &'a self,
        order: OrderRequest,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ExecutorResult<Fill>> {
        Box::pin(self.submit(order, credentials))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Hex HMAC-SHA256 over `timestamp + body`.
pub fn sign(secret: &str, timestamp: &str, body: &str) -> ExecutorResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExecutorError::Config(format!("signing key: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn fill_from_response(
    response: OrderResponse,
    order: &OrderRequest,
    client_order_id: OrderId,
) -> ExecutorResult<Fill> {
    match response.status {
        OrderStatus::Rejected => Err(ExecutorError::Rejected(
            response
                .reason
                .unwrap_or_else(|| "no reason given".to_string()),
        )),
        OrderStatus::Filled => Ok(Fill {
            order_id: response
                .order_id
                .map(OrderId::from_string)
                .unwrap_or(client_order_id),
            price: response.price.map(Price::new).unwrap_or(order.price_hint),
            quantity: response.quantity.map(Size::new).unwrap_or(order.quantity),
            fee: response.fee.unwrap_or(Decimal::ZERO),
        }),
    }
}
