use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use liqscope::config::AppConfig;
use liqscope::hyperliquid::InfoClient;
use liqscope::services::CycleReport;
use liqscope::AppState;

/// One scripted reply from the fake `/info` endpoint.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    RateLimited,
    Status(u16),
    Garbage,
    Body(Value),
}

#[derive(Default)]
struct MockInner {
    scripts: HashMap<String, VecDeque<Reply>>,
    hits: HashMap<String, usize>,
    marks: Vec<(String, String)>,
    spot: HashMap<String, String>,
    spot_hits: usize,
}

/// In-process stand-in for the exchange `POST /info` endpoint.
///
/// Replies for an address are consumed in order; the last one repeats.
/// Unscripted addresses get an empty account.
#[derive(Clone, Default)]
pub struct MockInfo {
    inner: Arc<Mutex<MockInner>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Duration,
}

#[allow(dead_code)]
impl MockInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(&self, address: &str, replies: Vec<Reply>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .insert(address.to_string(), replies.into());
        self
    }

    pub fn mark_price(&self, coin: &str, px: &str) -> &Self {
        self.inner.lock().unwrap().marks.push((coin.into(), px.into()));
        self
    }

    /// Spot USDC `total` reported for `address`. Unset addresses hold no spot.
    pub fn spot_balance(&self, address: &str, total: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .spot
            .insert(address.to_string(), total.to_string());
        self
    }

    pub fn spot_hits(&self) -> usize {
        self.inner.lock().unwrap().spot_hits
    }

    pub fn hits(&self, address: &str) -> usize {
        self.inner.lock().unwrap().hits.get(address).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, address: &str) -> Reply {
        let mut inner = self.inner.lock().unwrap();
        *inner.hits.entry(address.to_string()).or_default() += 1;

        match inner.scripts.get_mut(address) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Body(clearinghouse_payload(vec![]))),
            None => Reply::Body(clearinghouse_payload(vec![])),
        }
    }

    fn meta_and_ctxs(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let universe: Vec<Value> = inner.marks.iter().map(|(c, _)| json!({ "name": c })).collect();
        let ctxs: Vec<Value> = inner
            .marks
            .iter()
            .map(|(_, px)| json!({ "markPx": px, "funding": "0.0000125" }))
            .collect();
        json!([{ "universe": universe }, ctxs])
    }

    fn spot_state(&self, address: &str) -> Value {
        let mut inner = self.inner.lock().unwrap();
        inner.spot_hits += 1;
        let balances: Vec<Value> = inner
            .spot
            .get(address)
            .map(|total| {
                vec![
                    json!({ "coin": "HYPE", "total": "12.5", "hold": "0.0" }),
                    json!({ "coin": "USDC", "total": total, "hold": "0.0" }),
                ]
            })
            .unwrap_or_default();
        json!({ "balances": balances })
    }

    /// Serve on an ephemeral local port and return its base URL.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/info", post(info_handler))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}")
    }

    pub async fn client(&self) -> InfoClient {
        let base_url = self.spawn().await;
        InfoClient::with_base_url(reqwest::Client::new(), &base_url)
    }
}

async fn info_handler(State(mock): State<MockInfo>, Json(body): Json<Value>) -> Response {
    let now = mock.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    mock.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !mock.latency.is_zero() {
        tokio::time::sleep(mock.latency).await;
    }

    let response = match body["type"].as_str() {
        Some("clearinghouseState") => {
            let user = body["user"].as_str().unwrap_or_default().to_string();
            match mock.next_reply(&user) {
                Reply::RateLimited => StatusCode::TOO_MANY_REQUESTS.into_response(),
                Reply::Status(code) => StatusCode::from_u16(code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                    .into_response(),
                Reply::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
                Reply::Body(value) => Json(value).into_response(),
            }
        }
        Some("metaAndAssetCtxs") => Json(mock.meta_and_ctxs()).into_response(),
        Some("spotClearinghouseState") => {
            Json(mock.spot_state(body["user"].as_str().unwrap_or_default())).into_response()
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };

    mock.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

// ---------------------------------------------------------------------------
// Test data
// ---------------------------------------------------------------------------

/// One `assetPositions` entry in the exchange's wire format.
#[allow(dead_code)]
pub fn position_entry(coin: &str, szi: &str, value: &str, entry: &str, liq: Option<&str>) -> Value {
    json!({
        "type": "oneWay",
        "position": {
            "coin": coin,
            "szi": szi,
            "positionValue": value,
            "entryPx": entry,
            "unrealizedPnl": "0.0",
            "liquidationPx": liq,
            "leverage": { "type": "cross", "value": 10 }
        }
    })
}

#[allow(dead_code)]
pub fn clearinghouse_payload(entries: Vec<Value>) -> Value {
    json!({
        "marginSummary": { "accountValue": "0.0" },
        "assetPositions": entries,
    })
}

/// Config with fast pacing and backoff so tests run in milliseconds.
#[allow(dead_code)]
pub fn fast_config() -> AppConfig {
    AppConfig {
        inter_request_delay: Duration::ZERO,
        backoff_base: Duration::from_millis(10),
        max_workers: 4,
        ..AppConfig::default()
    }
}

/// App state with a private metrics recorder and an optional report.
#[allow(dead_code)]
pub fn test_state(report: Option<CycleReport>) -> AppState {
    AppState {
        config: Arc::new(AppConfig::default()),
        latest: Arc::new(RwLock::new(report.map(Arc::new))),
        metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
    }
}
