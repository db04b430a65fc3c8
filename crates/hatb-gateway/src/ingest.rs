//! Ingestion gate: authenticate, validate, admit.
//!
//! A request is authenticated before anything else is looked at, so a bad
//! secret never reaches validation or the store.

use chrono::Utc;
use hatb_core::{NewSignal, OrderSide, Price, Signal};
use hatb_store::DynStore;
use hatb_telemetry::Metrics;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{GatewayError, GatewayResult};

/// Webhook body as sent by the alerting source.
///
/// Fields default so that an unauthenticated request is reported as
/// unauthorized rather than malformed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub secret: Option<String>,
}

pub struct IngestionGate {
    store: DynStore,
    secret: String,
}

impl IngestionGate {
    pub fn new(store: DynStore, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    /// Admit one signal.
    ///
    /// `header_token` is the optional `X-TradingView-Token` value; either it or
    /// the body secret must match.
    pub async fn admit(
        &self,
        payload: WebhookPayload,
        header_token: Option<&str>,
    ) -> GatewayResult<Signal> {
        if !self.authenticate(payload.secret.as_deref(), header_token) {
            warn!(symbol = %payload.symbol, "Webhook rejected: invalid secret");
            Metrics::signal_rejected("unauthorized");
            return Err(GatewayError::Unauthorized);
        }

        let candidate = validate(&payload).map_err(|e| {
            warn!(symbol = %payload.symbol, error = %e, "Webhook rejected: invalid signal");
            Metrics::signal_rejected("validation");
            e
        })?;

        let signal = self
            .store
            .admit(candidate, Utc::now())
            .await
            .map_err(|e| {
                Metrics::signal_rejected("store");
                GatewayError::from(e)
            })?;

        Metrics::signal_admitted();
        info!(
            signal_id = %signal.id,
            symbol = %signal.symbol,
            action = %signal.action,
            "Webhook signal admitted"
        );
        Ok(signal)
    }

    fn authenticate(&self, body_secret: Option<&str>, header_token: Option<&str>) -> bool {
        let expected = self.secret.as_bytes();
        [body_secret, header_token]
            .into_iter()
            .flatten()
            .any(|candidate| constant_time_eq(candidate.as_bytes(), expected))
    }
}

fn validate(payload: &WebhookPayload) -> GatewayResult<NewSignal> {
    let action: OrderSide = payload
        .action
        .parse()
        .map_err(|e: hatb_core::CoreError| GatewayError::Validation(e.to_string()))?;
    let price = payload
        .price
        .map(Price::try_from_f64)
        .transpose()
        .map_err(|e| GatewayError::Validation(e.to_string()))?;
    NewSignal::new(&payload.symbol, action, price)
        .map_err(|e| GatewayError::Validation(e.to_string()))
}

/// Byte comparison whose running time depends only on the lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatb_core::SignalState;
    use hatb_store::{MemoryStore, SignalStore};
    use std::sync::Arc;

    const SECRET: &str = "s3cret";

    fn gate() -> (Arc<MemoryStore>, IngestionGate) {
        let store = Arc::new(MemoryStore::new());
        let gate = IngestionGate::new(store.clone(), SECRET);
        (store, gate)
    }

    fn payload(symbol: &str, action: &str, secret: Option<&str>) -> WebhookPayload {
        WebhookPayload {
            symbol: symbol.to_string(),
            action: action.to_string(),
            price: Some(50000.0),
            secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_valid_signal_admitted_as_new() {
        let (_store, gate) = gate();
        let signal = gate
            .admit(payload("BTCUSD", "buy", Some(SECRET)), None)
            .await
            .unwrap();
        assert_eq!(signal.state, SignalState::New);
        assert_eq!(signal.action, OrderSide::Buy);
        assert!(signal.processed_at.is_none());
    }

    #[tokio::test]
    async fn test_header_token_is_accepted() {
        let (_store, gate) = gate();
        let result = gate
            .admit(payload("BTCUSD", "SELL", None), Some(SECRET))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_secret_leaves_store_unchanged() {
        let (store, gate) = gate();
        let result = gate
            .admit(payload("BTCUSD", "BUY", Some("nope")), Some("also-nope"))
            .await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
        assert_eq!(store.state_counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_wins_over_invalid_payload() {
        let (_store, gate) = gate();
        let result = gate.admit(payload("", "HOLD", None), None).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let (store, gate) = gate();
        for bad in [
            payload("   ", "BUY", Some(SECRET)),
            payload("BTCUSD", "HOLD", Some(SECRET)),
            WebhookPayload {
                price: Some(-1.0),
                ..payload("BTCUSD", "BUY", Some(SECRET))
            },
            WebhookPayload {
                price: Some(f64::NAN),
                ..payload("BTCUSD", "BUY", Some(SECRET))
            },
        ] {
            let result = gate.admit(bad, None).await;
            assert!(matches!(result, Err(GatewayError::Validation(_))));
        }
        assert_eq!(store.state_counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_price_is_optional() {
        let (_store, gate) = gate();
        let signal = gate
            .admit(
                WebhookPayload {
                    price: None,
                    ..payload("ETHUSD", "SELL", Some(SECRET))
                },
                None,
            )
            .await
            .unwrap();
        assert!(signal.price.is_none());
    }
}
