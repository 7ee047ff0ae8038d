use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analytics::sweep_thresholds;
use crate::config::parse_thresholds;
use crate::errors::AppError;
use crate::models::{AggregatedBucket, Direction, FundingRate, ImpactSummary, Position, RiskReport, ThresholdRow};
use crate::services::CycleReport;
use crate::AppState;

use super::ApiResponse;

async fn latest_report(state: &AppState) -> Result<Arc<CycleReport>, AppError> {
    state
        .latest
        .read()
        .await
        .clone()
        .ok_or_else(|| AppError::NotFound("No completed cycle yet".into()))
}

pub async fn snapshot(State(state): State<AppState>) -> Result<Json<ApiResponse<CycleReport>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(CycleReport::clone(&report))))
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub coin: Option<String>,
    pub direction: Option<String>,
}

pub async fn positions(
    State(state): State<AppState>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<ApiResponse<Vec<Position>>>, AppError> {
    let direction = match query.direction.as_deref().map(str::to_lowercase).as_deref() {
        None => None,
        Some("long") => Some(Direction::Long),
        Some("short") => Some(Direction::Short),
        Some(other) => return Err(AppError::BadRequest(format!("Unknown direction: {other}"))),
    };
    let coin = query.coin.map(|c| c.trim().to_uppercase());

    let report = latest_report(&state).await?;
    let positions = report
        .positions
        .iter()
        .filter(|p| coin.as_ref().map_or(true, |c| p.coin == *c))
        .filter(|p| direction.map_or(true, |d| p.direction() == d))
        .cloned()
        .collect();

    Ok(Json(ApiResponse::ok(positions)))
}

pub async fn buckets(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<AggregatedBucket>>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(report.analysis.buckets.clone())))
}

pub async fn risk(State(state): State<AppState>) -> Result<Json<ApiResponse<RiskReport>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(report.analysis.risk.clone())))
}

#[derive(Serialize)]
pub struct TopPositions {
    pub longs: Vec<Position>,
    pub shorts: Vec<Position>,
}

pub async fn top(State(state): State<AppState>) -> Result<Json<ApiResponse<TopPositions>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(TopPositions {
        longs: report.analysis.top_longs.clone(),
        shorts: report.analysis.top_shorts.clone(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CascadeQuery {
    /// Comma-separated percentages; re-runs the sweep on the latest snapshot.
    pub thresholds: Option<String>,
}

pub async fn cascade(
    State(state): State<AppState>,
    Query(query): Query<CascadeQuery>,
) -> Result<Json<ApiResponse<Vec<ThresholdRow>>>, AppError> {
    let custom = match query.thresholds.as_deref() {
        Some(raw) => {
            let thresholds = parse_thresholds(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
            if thresholds.is_empty() {
                return Err(AppError::BadRequest("thresholds must not be empty".into()));
            }
            Some(thresholds)
        }
        None => None,
    };

    let report = latest_report(&state).await?;
    let rows = match custom {
        Some(thresholds) => sweep_thresholds(
            &report.positions,
            &report.prices,
            &thresholds,
            &state.config.tracked_coins,
        ),
        None => report.analysis.cascade.clone(),
    };

    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn impact(State(state): State<AppState>) -> Result<Json<ApiResponse<ImpactSummary>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(report.analysis.impact.clone())))
}

pub async fn funding(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<FundingRate>>>, AppError> {
    let report = latest_report(&state).await?;
    Ok(Json(ApiResponse::ok(report.funding.clone())))
}
