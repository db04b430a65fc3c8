//! HTTP server implementation using axum.
//!
//! | route                    | auth   | purpose                          |
//! |--------------------------|--------|----------------------------------|
//! | `GET /`                  | none   | liveness message                 |
//! | `POST /webhook/tradingview` | secret | admit a signal                |
//! | `GET/POST /api/v1/settings` | admin | read / upsert configuration   |
//! | `GET /api/v1/logs`       | admin  | execution log, newest first      |
//! | `GET /api/v1/signals`    | admin  | signals by state, newest first   |
//! | `GET /api/v1/status`     | admin  | scheduler and queue summary      |
//! | `GET /metrics`           | none   | Prometheus text exposition       |

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hatb_core::{ConfigurationUpdate, Page, Signal, SignalState};
use hatb_store::{ExecutionLog, SettingsStore, SignalStore};
use hatb_telemetry::Metrics;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::ingest::{constant_time_eq, WebhookPayload};
use crate::state::AppState;
use crate::types::{
    MessageResponse, PageQuery, SettingsSaved, SettingsView, SignalQuery, StatusResponse,
    TradeLogView, WebhookResponse,
};

const TOKEN_HEADER: &str = "x-tradingview-token";

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/webhook/tradingview", post(receive_webhook))
        .route("/api/v1/settings", get(get_settings).post(update_settings))
        .route("/api/v1/logs", get(get_logs))
        .route("/api/v1/signals", get(get_signals))
        .route("/api/v1/status", get(get_status))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "HATB Auto Trading Bot is running. Use /api/v1 for the admin API.".to_string(),
    })
}

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Json<WebhookResponse>> {
    let payload: WebhookPayload = parse_json(&body)?;
    let header_token = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());

    let signal = state.gate.admit(payload, header_token).await?;
    Ok(Json(WebhookResponse {
        message: "Webhook signal saved successfully".to_string(),
        signal_id: signal.id,
    }))
}

async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> GatewayResult<Json<SettingsView>> {
    authorize(&state, &headers)?;
    let config = state.store.configuration().await?.ok_or_else(|| {
        GatewayError::NotFound("Settings not found. Please initialize settings.".to_string())
    })?;
    Ok(Json(SettingsView::from(&config)))
}

async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Json<SettingsSaved>> {
    authorize(&state, &headers)?;
    let update: ConfigurationUpdate = parse_json(&body)?;
    let config = state.store.upsert_configuration(update, Utc::now()).await?;
    info!(
        strategy = %config.strategy_name,
        risk_per_trade = %config.risk_per_trade.inner(),
        is_active = config.is_active,
        "Settings updated"
    );
    Ok(Json(SettingsSaved {
        message: "Settings updated successfully".to_string(),
        data: SettingsView::from(&config),
    }))
}

async fn get_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> GatewayResult<Json<Vec<TradeLogView>>> {
    authorize(&state, &headers)?;
    let records = state.store.list_records(query.page()).await?;
    Ok(Json(records.into_iter().map(TradeLogView::from).collect()))
}

async fn get_signals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SignalQuery>,
) -> GatewayResult<Json<Vec<Signal>>> {
    authorize(&state, &headers)?;
    let filter = query
        .state
        .as_deref()
        .map(str::parse::<SignalState>)
        .transpose()
        .map_err(|e| GatewayError::Validation(e.to_string()))?;
    let signals = state.store.list_signals(filter, query.page()).await?;
    Ok(Json(signals))
}

async fn get_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> GatewayResult<Json<StatusResponse>> {
    authorize(&state, &headers)?;
    let configuration_active = state.store.active_configuration().await?.is_some();
    let last_trade_time = state
        .store
        .list_records(Page::new(1, 0))
        .await?
        .first()
        .map(|r| r.completed_at);
    let signals = state.store.state_counts().await?;

    Ok(Json(StatusResponse {
        is_core_running: state.scheduler.is_running(),
        configuration_active,
        last_trade_time,
        last_cycle_at: state.scheduler.last_cycle_at(),
        cycles: state.scheduler.cycles(),
        cycle_failures: state.scheduler.failures(),
        signals,
    }))
}

async fn metrics() -> GatewayResult<Response> {
    let text = Metrics::render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

/// Decode a JSON body, reporting failures as validation errors.
fn parse_json<T: DeserializeOwned>(body: &[u8]) -> GatewayResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::Validation(format!("invalid JSON body: {e}")))
}

/// Enforce basic auth on admin routes when it is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> GatewayResult<()> {
    if !state.config.auth_enabled() || check_basic_auth(headers, state) {
        Ok(())
    } else {
        Err(GatewayError::AdminUnauthorized)
    }
}

/// Check basic authentication.
fn check_basic_auth(headers: &HeaderMap, state: &AppState) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let expected = format!("{}:{}", state.config.admin_user, state.config.admin_pass);
    constant_time_eq(&decoded, expected.as_bytes())
}

/// Run the gateway until `shutdown` is cancelled.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> GatewayResult<()> {
    let port = state.config.port;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting gateway server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Gateway server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use hatb_executor::SchedulerStatus;
    use hatb_store::MemoryStore;
    use std::sync::Arc;

    fn state(user: &str, pass: &str) -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SchedulerStatus::new()),
            GatewayConfig {
                admin_user: user.to_string(),
                admin_pass: pass.to_string(),
                ..GatewayConfig::default()
            },
        )
    }

    fn basic(user_pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(user_pass));
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_auth_disabled_allows_all() {
        let state = state("", "");
        assert!(authorize(&state, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_basic_auth() {
        let state = state("admin", "pw");
        assert!(authorize(&state, &basic("admin:pw")).is_ok());
        assert!(authorize(&state, &basic("admin:wrong")).is_err());
        assert!(authorize(&state, &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        let result: GatewayResult<WebhookPayload> = parse_json(b"{not json");
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }
}
