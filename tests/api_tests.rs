mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use tower::ServiceExt;

use liqscope::api::router::create_router;
use liqscope::config::AppConfig;
use liqscope::ingestion::NormalizeStats;
use liqscope::models::{FundingRate, Position, PriceMap};
use liqscope::services::{analyze_snapshot, CycleReport};

fn make_position(address: &str, is_long: bool, value: i64, liq: i64) -> Position {
    Position {
        address: address.into(),
        coin: "BTC".into(),
        entry_price: Decimal::from(100_000),
        position_value: Decimal::from(value),
        unrealized_pnl: Decimal::from(-250),
        liquidation_price: Some(Decimal::from(liq)),
        leverage: Decimal::from(20),
        is_long,
        observed_at: Utc::now(),
    }
}

fn sample_report() -> CycleReport {
    let positions = vec![
        make_position("0xaaa", true, 500_000, 98_000),
        make_position("0xbbb", false, 120_000, 101_000),
        make_position("0xccc", true, 80_000, 94_000),
    ];
    let prices = PriceMap::from([("BTC".to_string(), Decimal::from(100_000))]);
    let analysis = analyze_snapshot(&positions, &prices, &AppConfig::default());

    CycleReport {
        started_at: Utc::now(),
        finished_at: Utc::now(),
        addresses_total: 3,
        addresses_failed: vec![],
        normalize: NormalizeStats {
            kept: 3,
            below_min: 0,
            malformed: 0,
        },
        direction_corrections: 0,
        prices,
        funding: FundingRate::from_hourly("BTC", Decimal::new(125, 7)).into_iter().collect(),
        positions,
        analysis,
    }
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(common::test_state(None));

    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["last_cycle_at"].is_null());
}

#[tokio::test]
async fn test_snapshot_not_found_before_first_cycle() {
    let app = create_router(common::test_state(None));

    let (status, json) = get_json(app, "/api/snapshot").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_snapshot_after_cycle() {
    let app = create_router(common::test_state(Some(sample_report())));

    let (status, json) = get_json(app, "/api/snapshot").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["positions"].as_array().unwrap().len(), 3);
    assert!(json["data"]["cascade"].is_array());
    assert!(json["data"]["impact"].is_object());
}

#[tokio::test]
async fn test_positions_filtered_by_direction() {
    let app = create_router(common::test_state(Some(sample_report())));

    let (status, json) = get_json(app, "/api/positions?direction=short").await;

    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["address"], "0xbbb");
}

#[tokio::test]
async fn test_positions_rejects_unknown_direction() {
    let app = create_router(common::test_state(Some(sample_report())));

    let (status, json) = get_json(app, "/api/positions?direction=sideways").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_buckets_and_top() {
    let state = common::test_state(Some(sample_report()));

    let (status, json) = get_json(create_router(state.clone()), "/api/buckets").await;
    assert_eq!(status, StatusCode::OK);
    let buckets = json["data"].as_array().unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0]["direction"], "LONG");
    assert_eq!(buckets[0]["trader_count"], 2);

    let (status, json) = get_json(create_router(state), "/api/top").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["longs"][0]["address"], "0xaaa");
    assert_eq!(json["data"]["shorts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cascade_with_custom_thresholds() {
    let state = common::test_state(Some(sample_report()));

    let (status, json) = get_json(create_router(state.clone()), "/api/cascade?thresholds=3,1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // 1%: only the short at 101000 is in band
    assert_eq!(rows[0]["direction"], "LONG");
    // 3%: long at 98000 joins
    assert_eq!(rows[1]["direction"], "SHORT");

    let (status, _) = get_json(create_router(state), "/api/cascade?thresholds=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cascade_rejects_out_of_range_thresholds() {
    let state = common::test_state(Some(sample_report()));

    // Large enough to overflow the price band if it were accepted.
    let (status, json) = get_json(
        create_router(state.clone()),
        "/api/cascade?thresholds=79228162514264337593543950335",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = get_json(create_router(state.clone()), "/api/cascade?thresholds=100.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(create_router(state), "/api/cascade?thresholds=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_risk_and_impact() {
    let state = common::test_state(Some(sample_report()));

    let (status, json) = get_json(create_router(state.clone()), "/api/risk").await;
    assert_eq!(status, StatusCode::OK);
    let longs = json["data"]["longs"].as_array().unwrap();
    assert_eq!(longs.len(), 2);
    assert_eq!(longs[0]["address"], "0xaaa");

    let (status, json) = get_json(create_router(state), "/api/impact").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["coins"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_funding() {
    let app = create_router(common::test_state(Some(sample_report())));

    let (status, json) = get_json(app, "/api/funding").await;

    assert_eq!(status, StatusCode::OK);
    let rates = json["data"].as_array().unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0]["coin"], "BTC");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router(common::test_state(None));

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}
