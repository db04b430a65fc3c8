//! Precision-safe decimal types for prices and quantities.
//!
//! Webhook payloads carry prices as JSON floats; everything past the
//! ingestion boundary works on `rust_decimal::Decimal` so fills, fees and
//! sizing never accumulate floating-point error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Price with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Convert a wire float into a strictly positive price.
    pub fn try_from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CoreError::InvalidPrice(format!("{value} is not finite")));
        }
        let decimal = Decimal::try_from(value)
            .map_err(|e| CoreError::InvalidPrice(format!("{value}: {e}")))?
            .normalize();
        let price = Self(decimal);
        if !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("{value} must be positive")));
        }
        Ok(price)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Lossy conversion for metrics and display only.
    pub fn to_f64_lossy(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Order quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Quantity that spends `notional` at `price`.
    ///
    /// Fails for a non-positive price or when the quotient does not fit a
    /// `Decimal` (e.g. a price of `1e-27`).
    pub fn from_notional(notional: Decimal, price: Price) -> Result<Self> {
        if !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("{price} must be positive")));
        }
        notional
            .checked_div(price.0)
            .map(Self)
            .ok_or_else(|| CoreError::Overflow(format!("{notional} / {price}")))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round down to a multiple of `step`.
    pub fn floor_to_step(&self, step: Size) -> Result<Self> {
        if step.0.is_zero() {
            return Ok(*self);
        }
        self.0
            .checked_div(step.0)
            .and_then(|lots| lots.floor().checked_mul(step.0))
            .map(Self)
            .ok_or_else(|| CoreError::Overflow(format!("{self} floored to step {step}")))
    }

    /// Notional value: size * price.
    pub fn notional(&self, price: Price) -> Result<Decimal> {
        self.0
            .checked_mul(price.0)
            .ok_or_else(|| CoreError::Overflow(format!("{self} * {price}")))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}
