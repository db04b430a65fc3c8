//! The externally managed run-configuration.
//!
//! The pipeline only ever reads the active `Configuration`; an admin
//! collaborator creates and updates it through `ConfigurationUpdate`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Exchange credential pair. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Secret key with everything but the last four characters hidden.
    pub fn masked_secret(&self) -> String {
        let chars: Vec<char> = self.secret_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Fraction of equity risked per trade, `0 < r <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct RiskFraction(Decimal);

impl RiskFraction {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(CoreError::InvalidRisk(format!(
                "{value} is outside (0, 1]"
            )));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl Default for RiskFraction {
    fn default() -> Self {
        Self(Decimal::new(1, 2)) // 0.01
    }
}

impl TryFrom<Decimal> for RiskFraction {
    type Error = CoreError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RiskFraction> for Decimal {
    fn from(r: RiskFraction) -> Self {
        r.0
    }
}

/// The single run-configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub credentials: Credentials,
    pub strategy_name: String,
    pub risk_per_trade: RiskFraction,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields an admin may set. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationUpdate {
    #[serde(default)]
    pub exchange_api_key: Option<String>,
    #[serde(default)]
    pub exchange_secret_key: Option<String>,
    #[serde(default)]
    pub strategy_name: Option<String>,
    #[serde(default)]
    pub risk_per_trade: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

const DEFAULT_STRATEGY: &str = "default_strategy";

impl Configuration {
    /// Create the first configuration row. Both credentials are required.
    pub fn create(update: ConfigurationUpdate, now: DateTime<Utc>) -> Result<Self> {
        let api_key = non_empty(update.exchange_api_key, "exchange_api_key")?;
        let secret_key = non_empty(update.exchange_secret_key, "exchange_secret_key")?;
        let risk_per_trade = match update.risk_per_trade {
            Some(r) => RiskFraction::new(r)?,
            None => RiskFraction::default(),
        };
        Ok(Self {
            credentials: Credentials::new(api_key, secret_key),
            strategy_name: update
                .strategy_name
                .unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
            risk_per_trade,
            is_active: update.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an update in place. Validation happens before any field changes.
    pub fn apply(&mut self, update: ConfigurationUpdate, now: DateTime<Utc>) -> Result<()> {
        let risk = update.risk_per_trade.map(RiskFraction::new).transpose()?;
        let api_key = update
            .exchange_api_key
            .map(|k| non_empty(Some(k), "exchange_api_key"))
            .transpose()?;
        let secret_key = update
            .exchange_secret_key
            .map(|k| non_empty(Some(k), "exchange_secret_key"))
            .transpose()?;

        if let Some(k) = api_key {
            self.credentials.api_key = k;
        }
        if let Some(k) = secret_key {
            self.credentials.secret_key = k;
        }
        if let Some(name) = update.strategy_name {
            self.strategy_name = name;
        }
        if let Some(r) = risk {
            self.risk_per_trade = r;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CoreError::InvalidConfig(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn full_update() -> ConfigurationUpdate {
        ConfigurationUpdate {
            exchange_api_key: Some("key".to_string()),
            exchange_secret_key: Some("supersecret".to_string()),
            strategy_name: None,
            risk_per_trade: Some(dec!(0.02)),
            is_active: None,
        }
    }

    #[test]
    fn test_risk_fraction_bounds() {
        assert!(RiskFraction::new(dec!(0)).is_err());
        assert!(RiskFraction::new(dec!(-0.1)).is_err());
        assert!(RiskFraction::new(dec!(1.01)).is_err());
        assert!(RiskFraction::new(dec!(1)).is_ok());
        assert!(RiskFraction::new(dec!(0.0001)).is_ok());
    }

    #[test]
    fn test_create_defaults() {
        let cfg = Configuration::create(full_update(), Utc::now()).unwrap();
        assert_eq!(cfg.strategy_name, "default_strategy");
        assert!(cfg.is_active);
        assert_eq!(cfg.risk_per_trade.inner(), dec!(0.02));
    }

    #[test]
    fn test_create_requires_credentials() {
        let update = ConfigurationUpdate {
            exchange_api_key: None,
            ..full_update()
        };
        assert!(Configuration::create(update, Utc::now()).is_err());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut cfg = Configuration::create(full_update(), Utc::now()).unwrap();
        let before = cfg.clone();
        let bad = ConfigurationUpdate {
            is_active: Some(false),
            risk_per_trade: Some(dec!(5)),
            ..Default::default()
        };
        assert!(cfg.apply(bad, Utc::now()).is_err());
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut cfg = Configuration::create(full_update(), Utc::now()).unwrap();
        let update = ConfigurationUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        cfg.apply(update, Utc::now()).unwrap();
        assert!(!cfg.is_active);
        assert_eq!(cfg.credentials.api_key, "key");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("key", "supersecret");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("supersecret"));
        assert_eq!(creds.masked_secret(), "****cret");
    }

    #[test]
    fn test_risk_fraction_deserialize_validates() {
        let ok: RiskFraction = serde_json::from_str("\"0.5\"").unwrap();
        assert_eq!(ok.inner(), dec!(0.5));
        assert!(serde_json::from_str::<RiskFraction>("\"2\"").is_err());
    }
}
