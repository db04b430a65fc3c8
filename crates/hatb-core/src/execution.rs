//! Execution inputs and results.
//!
//! This module provides types for:
//! - The order submitted to an execution endpoint (`OrderRequest`)
//! - The endpoint's successful answer (`Fill`)
//! - The append-only ledger entry (`ExecutionRecord`)
//! - Pagination of ledger reads (`Page`)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::{OrderId, OrderSide};
use crate::signal::{Signal, SignalId};
use crate::{Price, Size};

// ============================================================================
// Order request / fill
// ============================================================================

/// One order derived from a signal and the active configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub signal_id: SignalId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Size,
    /// Signal price, or the configured fallback when the signal had none.
    pub price_hint: Price,
}

/// A complete fill returned by an execution endpoint.
///
/// Partial fills are not modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Size,
    pub fee: Decimal,
}

// ============================================================================
// Execution record
// ============================================================================

/// Immutable record of one successful order attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Ledger sequence number, assigned on append.
    pub id: u64,
    /// Originating signal. Nullable so externally imported records fit.
    pub signal_id: Option<SignalId>,
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub executed_price: Price,
    pub executed_qty: Size,
    pub fee: Decimal,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Build the record for `signal` from `fill`. The ledger assigns `id`.
    pub fn from_fill(signal: &Signal, fill: Fill, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            signal_id: Some(signal.id),
            order_id: fill.order_id,
            symbol: signal.symbol.clone(),
            side: signal.action,
            executed_price: fill.price,
            executed_qty: fill.quantity,
            fee: fill.fee,
            completed_at,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Offset pagination for ledger and signal listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    /// `limit` is clamped to `1..=MAX_LIMIT`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::NewSignal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_from_fill_copies_signal_fields() {
        let signal = NewSignal::new("BTCUSD", OrderSide::Buy, Some(Price::new(dec!(50000))))
            .unwrap()
            .into_signal(SignalId::new(3), Utc::now());
        let fill = Fill {
            order_id: OrderId::from_string("X1".to_string()),
            price: Price::new(dec!(50000)),
            quantity: Size::new(dec!(0.002)),
            fee: dec!(0.05),
        };
        let record = ExecutionRecord::from_fill(&signal, fill, Utc::now());
        assert_eq!(record.signal_id, Some(SignalId::new(3)));
        assert_eq!(record.symbol, "BTCUSD");
        assert_eq!(record.side, OrderSide::Buy);
        assert_eq!(record.executed_price.inner(), dec!(50000));
    }

    #[test]
    fn test_page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(1000, 5).limit, Page::MAX_LIMIT);
        assert_eq!(Page::default().limit, 10);
    }
}
