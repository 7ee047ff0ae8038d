use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Read-only views over the latest cycle report
    let api = Router::new()
        .route("/api/snapshot", get(handlers::snapshot::snapshot))
        .route("/api/positions", get(handlers::snapshot::positions))
        .route("/api/buckets", get(handlers::snapshot::buckets))
        .route("/api/risk", get(handlers::snapshot::risk))
        .route("/api/top", get(handlers::snapshot::top))
        .route("/api/cascade", get(handlers::snapshot::cascade))
        .route("/api/impact", get(handlers::snapshot::impact))
        .route("/api/funding", get(handlers::snapshot::funding));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
