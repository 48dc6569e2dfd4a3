//! Game search API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use gamecubby_core::{suggestion_query, Game, GameFilter, GameSearch, SuggestKind, Suggestions};

use super::error::{api_error, search_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Game>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Suggestions,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/search
///
/// Faceted game search. Facet id lists repeat their key
/// (`platform_ids=1&platform_ids=2`).
pub async fn search_games(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let filter = GameFilter::from_params(&params).map_err(search_error)?;
    let results = state
        .catalog()
        .search_games(&filter)
        .map_err(search_error)?;

    Ok(Json(SearchResponse {
        total: results.len(),
        results,
    }))
}

/// GET /api/v1/search/suggest/{kind}?q=...
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let kind = SuggestKind::from_path(&kind).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Unknown suggestion kind: {kind}"),
        )
    })?;
    let q = suggestion_query(&params.q).map_err(search_error)?;

    let suggestions = state.catalog().suggest(kind, q).map_err(search_error)?;
    Ok(Json(SuggestResponse { suggestions }))
}
