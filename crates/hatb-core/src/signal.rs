//! Inbound trading signals and their processing lifecycle.
//!
//! ```text
//!            claim            commit_execution
//!   NEW ───────────▶ CLAIMED ─────────────────▶ PROCESSED
//!                        │
//!                        └──── mark_failed ───▶ FAILED
//! ```
//!
//! `CLAIMED` is owned by exactly one in-flight processing attempt. Both
//! terminal states are final; a failed signal is retried only by admitting
//! a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::order::OrderSide;
use crate::Price;

/// Monotonically increasing signal identity, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(u64);

impl SignalId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalState {
    /// Admitted, waiting for a poll cycle.
    #[default]
    New,
    /// Owned by one in-flight processing attempt.
    Claimed,
    /// Executed; an execution record exists.
    Processed,
    /// Execution was rejected or timed out.
    Failed,
}

impl SignalState {
    pub const ALL: [SignalState; 4] = [Self::New, Self::Claimed, Self::Processed, Self::Failed];

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }

    /// Whether `self → next` is an edge of the lifecycle graph.
    #[must_use]
    pub fn can_transition_to(&self, next: SignalState) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Claimed)
                | (Self::Claimed, Self::Processed)
                | (Self::Claimed, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Claimed => "CLAIMED",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "CLAIMED" => Ok(Self::Claimed),
            "PROCESSED" => Ok(Self::Processed),
            "FAILED" => Ok(Self::Failed),
            other => Err(CoreError::InvalidState(other.to_string())),
        }
    }
}

/// A validated admission candidate that has not been assigned an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSignal {
    symbol: String,
    action: OrderSide,
    price: Option<Price>,
}

impl NewSignal {
    /// Validate a candidate. The symbol is trimmed and must be non-empty.
    pub fn new(symbol: &str, action: OrderSide, price: Option<Price>) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(CoreError::InvalidSymbol("symbol must not be empty".to_string()));
        }
        if let Some(p) = price {
            if !p.is_positive() {
                return Err(CoreError::InvalidPrice(format!("{p} must be positive")));
            }
        }
        Ok(Self {
            symbol: symbol.to_string(),
            action,
            price,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn action(&self) -> OrderSide {
        self.action
    }

    pub fn price(&self) -> Option<Price> {
        self.price
    }

    /// Bind the candidate to its assigned identity.
    pub fn into_signal(self, id: SignalId, received_at: DateTime<Utc>) -> Signal {
        Signal {
            id,
            symbol: self.symbol,
            action: self.action,
            price: self.price,
            received_at,
            state: SignalState::New,
            processed_at: None,
            failure_reason: None,
        }
    }
}

/// One inbound trading instruction.
///
/// `symbol`, `action` and `price` never change after admission; only the
/// store mutates `state`, `processed_at` and `failure_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub symbol: String,
    pub action: OrderSide,
    pub price: Option<Price>,
    pub received_at: DateTime<Utc>,
    pub state: SignalState,
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Signal {
    /// Move to `next`, enforcing the lifecycle graph.
    pub fn transition(&mut self, next: SignalState, at: DateTime<Utc>) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::IllegalTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.processed_at = Some(at);
        }
        Ok(())
    }
}
