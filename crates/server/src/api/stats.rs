//! Collection statistics API handlers.
//!
//! Reads are served from the stats cache; only `refresh` forces a
//! recompute before the TTL runs out.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use gamecubby_core::stats::{Cached, MetricDetails, RefreshReport};
use gamecubby_core::{HealthStats, OverviewStats};

use super::error::{stats_error, ApiError};
use super::middleware::AdminUser;
use crate::state::AppState;

/// GET /api/v1/stats/overview
pub async fn overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Cached<OverviewStats>>, ApiError> {
    state.stats().overview().map(Json).map_err(stats_error)
}

/// GET /api/v1/stats/health
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Cached<HealthStats>>, ApiError> {
    state.stats().health().map(Json).map_err(stats_error)
}

/// GET /api/v1/stats/health/{metric}
pub async fn health_details(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
) -> Result<Json<MetricDetails>, ApiError> {
    state
        .stats()
        .health_details_by_name(&metric)
        .map(Json)
        .map_err(stats_error)
}

/// POST /api/v1/stats/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
) -> Result<Json<RefreshReport>, ApiError> {
    let report = state.stats().refresh().map_err(stats_error)?;
    info!(user_id = %identity.user_id, "Stats refreshed via API");
    Ok(Json(report))
}
