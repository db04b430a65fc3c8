//! Order sizing from the run-configuration's risk fraction.

use hatb_core::{Configuration, OrderRequest, Price, Signal, Size};
use rust_decimal::Decimal;

use crate::error::{ExecutorError, ExecutorResult};

/// Turns a signal plus the active configuration into an order.
///
/// `quantity = account_equity × risk_per_trade ÷ price_hint`, floored to
/// `lot_step` and raised to `min_quantity` if it falls below. A price so
/// small or large that the quantity does not fit a `Decimal` rejects the
/// order.
#[derive(Debug, Clone)]
pub struct OrderSizer {
    account_equity: Decimal,
    lot_step: Size,
    min_quantity: Size,
    fallback_price: Price,
}

impl OrderSizer {
    pub fn new(
        account_equity: Decimal,
        lot_step: Size,
        min_quantity: Size,
        fallback_price: Price,
    ) -> Self {
        Self {
            account_equity,
            lot_step,
            min_quantity,
            fallback_price,
        }
    }

    /// Price used when the signal carries none.
    pub fn fallback_price(&self) -> Price {
        self.fallback_price
    }

    pub fn order_for(
        &self,
        signal: &Signal,
        config: &Configuration,
    ) -> ExecutorResult<OrderRequest> {
        let price_hint = signal.price.unwrap_or(self.fallback_price);
        let notional = self
            .account_equity
            .checked_mul(config.risk_per_trade.inner())
            .ok_or_else(|| ExecutorError::Rejected("order notional overflows".to_string()))?;
        let quantity = Size::from_notional(notional, price_hint)
            .and_then(|q| q.floor_to_step(self.lot_step))
            .map_err(|e| ExecutorError::Rejected(format!("cannot size order: {e}")))?
            .max(self.min_quantity);

        Ok(OrderRequest {
            signal_id: signal.id,
            symbol: signal.symbol.clone(),
            side: signal.action,
            quantity,
            price_hint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hatb_core::{ConfigurationUpdate, NewSignal, OrderSide, SignalId};
    use rust_decimal_macros::dec;

    fn sizer() -> OrderSizer {
        OrderSizer::new(
            dec!(10000),
            Size::new(dec!(0.0001)),
            Size::new(dec!(0.01)),
            Price::new(dec!(100)),
        )
    }

    fn config(risk: Decimal) -> Configuration {
        Configuration::create(
            ConfigurationUpdate {
                exchange_api_key: Some("k".to_string()),
                exchange_secret_key: Some("s".to_string()),
                risk_per_trade: Some(risk),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn signal(price: Option<Decimal>) -> Signal {
        NewSignal::new("ETHUSD", OrderSide::Sell, price.map(Price::new))
            .unwrap()
            .into_signal(SignalId::new(3), Utc::now())
    }

    #[test]
    fn test_quantity_from_risk_and_price() {
        // 10000 * 0.02 / 400 = 0.5
        let order = sizer()
            .order_for(&signal(Some(dec!(400))), &config(dec!(0.02)))
            .unwrap();
        assert_eq!(order.quantity.inner(), dec!(0.5));
        assert_eq!(order.price_hint.inner(), dec!(400));
        assert_eq!(order.side, OrderSide::Sell);
    }

    #[test]
    fn test_quantity_floored_to_lot_step() {
        // 10000 * 0.01 / 3000 = 0.03333..
        let order = sizer()
            .order_for(&signal(Some(dec!(3000))), &config(dec!(0.01)))
            .unwrap();
        assert_eq!(order.quantity.inner(), dec!(0.0333));
    }

    #[test]
    fn test_quantity_never_below_minimum() {
        let order = sizer()
            .order_for(&signal(Some(dec!(1000000))), &config(dec!(0.01)))
            .unwrap();
        assert_eq!(order.quantity.inner(), dec!(0.01));
    }

    #[test]
    fn test_missing_price_uses_fallback() {
        let order = sizer()
            .order_for(&signal(None), &config(dec!(0.01)))
            .unwrap();
        assert_eq!(order.price_hint.inner(), dec!(100));
        assert_eq!(order.quantity.inner(), dec!(1));
    }

    #[test]
    fn test_unrepresentable_quantity_is_rejected() {
        // 10000 * 0.01 / 1e-27 does not fit a Decimal.
        let tiny = Price::try_from_f64(1e-27).unwrap().inner();
        let result = sizer().order_for(&signal(Some(tiny)), &config(dec!(0.01)));
        assert!(matches!(result, Err(ExecutorError::Rejected(_))));
    }
}
