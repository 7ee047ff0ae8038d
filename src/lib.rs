pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod hyperliquid;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::LatestReport;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub latest: LatestReport,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
