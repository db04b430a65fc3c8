//! HTTP API tests against the axum router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use hatb_bot::{AppConfig, Application, StoreKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "gateway-secret";

fn app(admin: Option<(&str, &str)>) -> Application {
    let mut config = AppConfig::default();
    config.store.kind = StoreKind::Memory;
    config.gateway.webhook_secret = SECRET.to_string();
    if let Some((user, pass)) = admin {
        config.gateway.admin_user = user.to_string();
        config.gateway.admin_pass = pass.to_string();
    }
    Application::new(config).unwrap()
}

fn router(app: &Application) -> Router {
    hatb_gateway::create_router(app.gateway_state())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn configure(router: &Router, active: bool) {
    let (status, _) = send(
        router,
        post_json(
            "/api/v1/settings",
            json!({
                "exchange_api_key": "api-key",
                "exchange_secret_key": "super-secret-1234",
                "strategy_name": "breakout",
                "risk_per_trade": 0.02,
                "is_active": active
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_root_reports_running() {
    let app = app(None);
    let (status, body) = send(&router(&app), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_webhook_accepts_body_secret() {
    let app = app(None);
    let router = router(&app);
    let (status, body) = send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "price": 50000.0, "secret": SECRET}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signal_id"], json!(1));
}

#[tokio::test]
async fn test_webhook_accepts_header_token() {
    let app = app(None);
    let request = Request::post("/webhook/tradingview")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-TradingView-Token", SECRET)
        .body(Body::from(json!({"symbol": "ETHUSD", "action": "sell"}).to_string()))
        .unwrap();
    let (status, _) = send(&router(&app), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_rejects_bad_secret() {
    let app = app(None);
    let router = router(&app);
    let (status, body) = send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "secret": "nope"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], json!("Invalid secret token"));

    let (_, signals) = send(&router, get("/api/v1/signals")).await;
    assert_eq!(signals.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_webhook_rejects_malformed_and_invalid() {
    let app = app(None);
    let router = router(&app);

    let request = Request::post("/webhook/tradingview")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "HOLD", "secret": SECRET}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_settings_lifecycle() {
    let app = app(None);
    let router = router(&app);

    let (status, _) = send(&router, get("/api/v1/settings")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    configure(&router, true).await;

    let (status, body) = send(&router, get("/api/v1/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exchange_api_key"], json!("api-key"));
    assert_eq!(body["exchange_secret_key"], json!("****1234"));
    assert_eq!(body["strategy_name"], json!("breakout"));
    assert_eq!(body["is_active"], json!(true));

    // Partial update keeps other fields.
    let (status, body) = send(
        &router,
        post_json("/api/v1/settings", json!({"is_active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], json!(false));
    assert_eq!(body["data"]["strategy_name"], json!("breakout"));
}

#[tokio::test]
async fn test_settings_rejects_invalid_risk() {
    let app = app(None);
    let router = router(&app);
    let (status, _) = send(
        &router,
        post_json(
            "/api/v1/settings",
            json!({
                "exchange_api_key": "k",
                "exchange_secret_key": "s",
                "risk_per_trade": 1.5
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logs_newest_first_with_limit() {
    let app = app(None);
    let router = router(&app);
    configure(&router, true).await;

    for symbol in ["AAA", "BBB", "CCC"] {
        let (status, _) = send(
            &router,
            post_json(
                "/webhook/tradingview",
                json!({"symbol": symbol, "action": "BUY", "price": 10.0, "secret": SECRET}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    app.scheduler().run_cycle().await.unwrap();

    let (status, body) = send(&router, get("/api/v1/logs?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    let newer: DateTime<Utc> = logs[0]["log_time"].as_str().unwrap().parse().unwrap();
    let older: DateTime<Utc> = logs[1]["log_time"].as_str().unwrap().parse().unwrap();
    assert!(newer >= older);
    assert!(logs[0]["order_id"].as_str().unwrap().starts_with("ORDER_"));

    let (_, body) = send(&router, get("/api/v1/logs?limit=10&offset=2")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_round_trip_visible_in_logs() {
    let app = app(None);
    let router = router(&app);
    configure(&router, true).await;

    let (status, admitted) = send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "price": 50000, "secret": SECRET}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    app.scheduler().run_cycle().await.unwrap();

    let (status, body) = send(&router, get("/api/v1/logs")).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["symbol"], json!("BTCUSD"));
    assert_eq!(logs[0]["side"], json!("BUY"));
    assert_eq!(logs[0]["signal_id"], admitted["signal_id"]);
    assert_eq!(decimal(&logs[0]["executed_price"]), dec!(50000));
}

#[tokio::test]
async fn test_signals_filter_by_state() {
    let app = app(None);
    let router = router(&app);
    for symbol in ["X", "Y"] {
        send(
            &router,
            post_json(
                "/webhook/tradingview",
                json!({"symbol": symbol, "action": "BUY", "secret": SECRET}),
            ),
        )
        .await;
    }

    let (status, body) = send(&router, get("/api/v1/signals?state=new")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["state"], json!("NEW"));

    let (_, body) = send(&router, get("/api/v1/signals?state=failed")).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&router, get("/api/v1/signals?state=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_reports_counts() {
    let app = app(None);
    let router = router(&app);
    configure(&router, true).await;
    send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "secret": SECRET}),
        ),
    )
    .await;
    app.scheduler().run_cycle().await.unwrap();

    let (status, body) = send(&router, get("/api/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_core_running"], json!(false));
    assert_eq!(body["configuration_active"], json!(true));
    assert_eq!(body["signals"]["processed"], json!(1));
    assert!(body["last_trade_time"].is_string());
}

#[tokio::test]
async fn test_admin_routes_require_basic_auth() {
    let app = app(Some(("admin", "pw")));
    let router = router(&app);

    let (status, _) = send(&router, get("/api/v1/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // "admin:pw"
    let request = Request::get("/api/v1/status")
        .header(header::AUTHORIZATION, "Basic YWRtaW46cHc=")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);

    // The webhook uses its own secret, not basic auth.
    let (status, _) = send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "secret": SECRET}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposed() {
    let app = app(None);
    let router = router(&app);
    send(
        &router,
        post_json(
            "/webhook/tradingview",
            json!({"symbol": "BTCUSD", "action": "BUY", "secret": SECRET}),
        ),
    )
    .await;

    let response = router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("hatb_signals_admitted_total"));
}
