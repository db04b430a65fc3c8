//! Request and response bodies for the HTTP API.

use chrono::{DateTime, Utc};
use hatb_core::{Configuration, ExecutionRecord, OrderId, OrderSide, Page, Price, SignalId, Size};
use hatb_store::StateCounts;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Reply to an admitted webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub message: String,
    pub signal_id: SignalId,
}

/// The configuration row as shown to admins. The secret is masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsView {
    pub exchange_api_key: String,
    pub exchange_secret_key: String,
    pub strategy_name: String,
    pub risk_per_trade: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Configuration> for SettingsView {
    fn from(config: &Configuration) -> Self {
        Self {
            exchange_api_key: config.credentials.api_key.clone(),
            exchange_secret_key: config.credentials.masked_secret(),
            strategy_name: config.strategy_name.clone(),
            risk_per_trade: config.risk_per_trade.inner(),
            is_active: config.is_active,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSaved {
    pub message: String,
    pub data: SettingsView,
}

/// One execution log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogView {
    pub id: u64,
    pub signal_id: Option<SignalId>,
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub executed_price: Price,
    pub executed_qty: Size,
    pub fee: Decimal,
    pub log_time: DateTime<Utc>,
}

impl From<ExecutionRecord> for TradeLogView {
    fn from(record: ExecutionRecord) -> Self {
        Self {
            id: record.id,
            signal_id: record.signal_id,
            order_id: record.order_id,
            symbol: record.symbol,
            side: record.side,
            executed_price: record.executed_price,
            executed_qty: record.executed_qty,
            fee: record.fee,
            log_time: record.completed_at,
        }
    }
}

/// `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(
            self.limit.unwrap_or(Page::DEFAULT_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

/// `?state=&limit=&offset=` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalQuery {
    pub state: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SignalQuery {
    pub fn page(&self) -> Page {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .page()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub is_core_running: bool,
    pub configuration_active: bool,
    pub last_trade_time: Option<DateTime<Utc>>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub cycle_failures: u64,
    pub signals: StateCounts,
}
