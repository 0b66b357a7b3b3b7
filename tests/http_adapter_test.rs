//! HTTP Adapter Tests - Quote Provider and Health Server
//!
//! Serves canned responses from a local axum server and checks that
//! the HTTP quote provider maps each one to the right value or
//! error kind, and that the health router reports state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::json;

use ticker_poller::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use ticker_poller::adapters::quotes::{HttpQuoteProvider, ProviderDescriptor, build_http_client};
use ticker_poller::domain::SeriesKey;
use ticker_poller::ports::{FetchError, QuoteProvider};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn quote_app() -> Router {
    Router::new()
        .route(
            "/api/v3/ticker/price",
            get(|| async { axum::Json(json!({"symbol": "BTCUSDT", "price": "109345.12"})) }),
        )
        .route(
            "/latest",
            get(|| async { axum::Json(json!({"base": "USD", "rates": {"EUR": 0.92}})) }),
        )
        .route("/broken", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }))
        .route("/nofield", get(|| async { axum::Json(json!({"price": null})) }))
        .route("/notjson", get(|| async { "hello" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                axum::Json(json!({"price": 1}))
            }),
        )
}

fn provider(addr: SocketAddr, path: &str, field: &str, params: &[(&str, &str)]) -> HttpQuoteProvider {
    let descriptor = ProviderDescriptor {
        name: "local".to_string(),
        endpoint: format!("http://{addr}{path}"),
        field: field.to_string(),
        timeout: Duration::from_millis(300),
    };
    let params: HashMap<String, String> = params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let http = build_http_client("DualTicker/1.0").unwrap();
    HttpQuoteProvider::bind(http, &descriptor, &SeriesKey::new("BTCUSDT"), &params).unwrap()
}

#[tokio::test]
async fn test_spot_price_string_field() {
    let addr = serve(quote_app()).await;
    let p = provider(addr, "/api/v3/ticker/price?symbol={symbol}", "price", &[]);
    assert!(p.url().ends_with("symbol=BTCUSDT"));
    let value = p.fetch_quote(&SeriesKey::new("BTCUSDT")).await.unwrap();
    assert_eq!(value, 109_345.12);
}

#[tokio::test]
async fn test_nested_rate_field() {
    let addr = serve(quote_app()).await;
    let p = provider(addr, "/latest?from={base}", "rates.{quote}", &[("base", "USD"), ("quote", "EUR")]);
    let value = p.fetch_quote(&SeriesKey::new("USD/EUR")).await.unwrap();
    assert_eq!(value, 0.92);
}

#[tokio::test]
async fn test_non_success_status_is_protocol_error() {
    let addr = serve(quote_app()).await;
    let p = provider(addr, "/broken", "price", &[]);
    let err = p.fetch_quote(&SeriesKey::new("BTCUSDT")).await.unwrap_err();
    assert_eq!(err, FetchError::Protocol { status: 503 });
}

#[tokio::test]
async fn test_null_field_and_bad_body_are_parse_errors() {
    let addr = serve(quote_app()).await;
    let key = SeriesKey::new("BTCUSDT");

    let err = provider(addr, "/nofield", "price", &[]).fetch_quote(&key).await.unwrap_err();
    assert_eq!(err.kind(), "parse");

    let err = provider(addr, "/notjson", "price", &[]).fetch_quote(&key).await.unwrap_err();
    assert_eq!(err.kind(), "parse");
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let addr = serve(quote_app()).await;
    let p = provider(addr, "/slow", "price", &[]);
    let started = std::time::Instant::now();
    let err = p.fetch_quote(&SeriesKey::new("BTCUSDT")).await.unwrap_err();
    assert_eq!(err.kind(), "network");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = provider(addr, "/", "price", &[])
        .fetch_quote(&SeriesKey::new("BTCUSDT"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "network");
}

#[tokio::test]
async fn test_health_endpoints() {
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    metrics.fetches.with_label_values(&["BTCUSDT", "success"]).inc();
    let state = HealthState::new(Arc::clone(&metrics));
    let addr = serve(HealthServer::router(state.clone())).await;
    let http = reqwest::Client::new();

    let live = http.get(format!("http://{addr}/live")).send().await.unwrap();
    assert_eq!(live.status(), reqwest::StatusCode::OK);

    let ready = http.get(format!("http://{addr}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::OK);

    state.polling.store(false, Ordering::Relaxed);
    let ready = http.get(format!("http://{addr}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let body = http
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("ticker_poller_fetches_total"));
}
