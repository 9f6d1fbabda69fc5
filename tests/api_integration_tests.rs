//! Integration Tests for API Endpoints
//!
//! Drives the full router over the in-process memory tier and a static order
//! source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use order_cache::{
    api::create_router,
    cache::{CacheEngine, MemoryTier},
    error::{Result, ServiceError},
    models::TradeOrder,
    source::{OrderQuery, OrderSource, StaticOrderSource},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn orders() -> Vec<TradeOrder> {
    (1..=30u64)
        .map(|n| TradeOrder {
            trade_no: (1000 + n).to_string(),
            user_id: (n % 2 + 1).to_string(),
            subject: format!("order {}", n),
            total_amount: n as f64,
            payment_amount: n as f64,
            ..TradeOrder::default()
        })
        .collect()
}

struct TestApp {
    router: Router,
    remote: Arc<MemoryTier>,
    source: Arc<StaticOrderSource>,
}

fn create_test_app() -> TestApp {
    let remote = Arc::new(MemoryTier::new());
    let source = Arc::new(StaticOrderSource::new(orders()));
    let engine = Arc::new(CacheEngine::remote_only(remote.clone()));
    let state = AppState::new(engine, source.clone(), Duration::from_secs(3600));
    TestApp {
        router: create_router(state),
        remote,
        source,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn trade_nos(json: &Value) -> Vec<String> {
    json["data"]["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["TradeNo"].as_str().unwrap().to_string())
        .collect()
}

// == Order Endpoint Tests ==

#[tokio::test]
async fn test_first_request_populates_cache() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/order?pageNumber=0&pageSize=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 200);
    assert_eq!(json["data"]["total"], 30);
    assert_eq!(trade_nos(&json)[0], "1030");
    assert_eq!(json["data"]["orders"][0]["TotalAmount"], "30");

    assert!(app.remote.contains_key("sortset:order:0:0:0:10"));
    assert!(app.remote.hash_field("hashmap:order", "1030").is_some());
    assert_eq!(
        app.remote
            .hash_field("total_hit_map", "sortset:order:0:0:0:10")
            .as_deref(),
        Some("30")
    );
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let app = create_test_app();

    let (_, first) = get(&app.router, "/order?pageNumber=1&pageSize=10").await;
    let (status, second) = get(&app.router, "/order?pageNumber=1&pageSize=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(trade_nos(&first), trade_nos(&second));
    assert_eq!(second["data"]["total"], 30);
    assert_eq!(app.source.query_count(), 1);

    let (_, stats) = get(&app.router, "/stats").await;
    assert_eq!(stats["range_hits"], 1);
    assert_eq!(stats["range_misses"], 1);
    assert_eq!(stats["populations"], 1);
}

#[tokio::test]
async fn test_each_page_cached_independently() {
    let app = create_test_app();

    let (_, page1) = get(&app.router, "/order?pageNumber=1&pageSize=10").await;
    let (_, page0) = get(&app.router, "/order?pageNumber=0&pageSize=10").await;
    assert_eq!(trade_nos(&page1)[0], "1020");
    assert_eq!(trade_nos(&page0)[0], "1030");

    let (_, cached0) = get(&app.router, "/order?pageNumber=0&pageSize=10").await;
    let (_, cached1) = get(&app.router, "/order?pageNumber=1&pageSize=10").await;
    assert_eq!(trade_nos(&cached0), trade_nos(&page0));
    assert_eq!(trade_nos(&cached1), trade_nos(&page1));
    assert_eq!(app.source.query_count(), 2);

    let (_, wide) = get(&app.router, "/order?pageNumber=0&pageSize=20").await;
    assert_eq!(trade_nos(&wide).len(), 20);
    assert_eq!(app.source.query_count(), 3);
}

#[tokio::test]
async fn test_filters_use_separate_result_sets() {
    let app = create_test_app();

    let (_, json) = get(&app.router, "/order?userId=2&pageSize=50").await;
    assert_eq!(json["data"]["total"], 15);
    assert!(json["data"]["orders"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["UserId"] == "2"));

    assert!(app.remote.contains_key("sortset:order:2:0:0:50"));
    assert!(!app.remote.contains_key("sortset:order:0:0:0:50"));

    let (_, single) = get(&app.router, "/order?tradeNo=1007").await;
    assert_eq!(single["data"]["total"], 1);
    assert_eq!(trade_nos(&single), vec!["1007"]);
}

#[tokio::test]
async fn test_page_past_end_returns_empty() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/order?pageNumber=9&pageSize=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 30);
    assert!(json["data"]["orders"].as_array().unwrap().is_empty());
    assert!(!app.remote.contains_key("sortset:order:0:0:9:10"));
}

#[tokio::test]
async fn test_invalid_page_size_rejected() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/order?pageSize=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    assert!(json["data"].is_null());
    assert_eq!(app.source.query_count(), 0);
}

#[tokio::test]
async fn test_malformed_query_rejected() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/order?userId=-4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!json["message"].as_str().unwrap().is_empty());
}

struct DownSource;

#[async_trait]
impl OrderSource for DownSource {
    async fn get_order(&self, _query: &OrderQuery) -> Result<(i64, Vec<TradeOrder>)> {
        Err(ServiceError::Upstream("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_source_failure_returns_bad_gateway() {
    let engine = Arc::new(CacheEngine::remote_only(Arc::new(MemoryTier::new())));
    let state = AppState::new(engine, Arc::new(DownSource), Duration::from_secs(60));
    let router = create_router(state);

    let (status, json) = get(&router, "/order").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], 502);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

// == Health & Stats Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_stats_endpoint_initial() {
    let app = create_test_app();

    let (status, json) = get(&app.router, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["range_hits"], 0);
    assert_eq!(json["reclaimed"], 0);
    assert_eq!(json["hit_rate"], 0.0);
}
