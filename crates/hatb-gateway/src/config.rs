//! Gateway configuration.

use serde::{Deserialize, Serialize};

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret expected in the webhook body or `X-TradingView-Token`.
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,
    /// Basic auth username for the admin API (empty = disabled).
    #[serde(default)]
    pub admin_user: String,
    /// Basic auth password for the admin API (empty = disabled).
    #[serde(default)]
    pub admin_pass: String,
}

fn default_port() -> u16 {
    8000
}

fn default_webhook_secret() -> String {
    "DEFAULT_SECRET_KEY".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            webhook_secret: default_webhook_secret(),
            admin_user: String::new(),
            admin_pass: String::new(),
        }
    }
}

impl GatewayConfig {
    /// Check if basic auth is enabled.
    pub fn auth_enabled(&self) -> bool {
        !self.admin_user.is_empty() && !self.admin_pass.is_empty()
    }
}
