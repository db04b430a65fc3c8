//! Order side and exchange order identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::signal::SignalId;

/// Order side, also the action carried by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    /// Alert templates send either case, so matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            _ => Err(CoreError::InvalidAction(s.to_string())),
        }
    }
}

/// Exchange-assigned order identifier.
///
/// Unique per execution attempt. Locally generated ids embed the signal id,
/// and a signal completes at most once, so they cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Format: `ORDER_{unix_micros}_{signal_id}`
    pub fn generate(signal_id: SignalId, at: DateTime<Utc>) -> Self {
        Self(format!("ORDER_{}_{}", at.timestamp_micros(), signal_id))
    }

    /// Wrap an id returned by a remote endpoint.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse_case_insensitive() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("sell".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!(" Buy ".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert!("HOLD".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_side_serde_uppercase() {
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn test_order_id_embeds_signal_id() {
        let at = Utc::now();
        let a = OrderId::generate(SignalId::new(7), at);
        let b = OrderId::generate(SignalId::new(8), at);
        assert!(a.as_str().starts_with("ORDER_"));
        assert!(a.as_str().ends_with("_7"));
        assert_ne!(a, b);
    }
}
