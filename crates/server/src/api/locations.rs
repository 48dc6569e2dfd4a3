//! Location hierarchy API handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use gamecubby_core::{DeleteOutcome, Location, LocationPathEntry, LocationStore, NamedEntity};

use super::error::{location_error, ApiError, ErrorResponse, IdPath};
use super::middleware::AdminUser;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a location
#[derive(Debug, Deserialize)]
pub struct CreateLocationBody {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Free-form label ("room", "shelf", ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameLocationBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MigrateBody {
    pub from_id: i64,
    pub to_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub path: Vec<LocationPathEntry>,
}

#[derive(Debug, Serialize)]
pub struct DescendantsResponse {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct LocationGamesResponse {
    pub games: Vec<NamedEntity>,
}

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub migrated: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
}

/// Blocked delete: the outcome plus a readable reason.
#[derive(Debug, Serialize)]
pub struct DeleteBlockedResponse {
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
    #[serde(flatten)]
    pub error: ErrorResponse,
}

// ============================================================================
// Read handlers
// ============================================================================

/// GET /api/v1/locations
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LocationsResponse>, ApiError> {
    let locations = state.catalog().list_locations().map_err(location_error)?;
    Ok(Json(LocationsResponse { locations }))
}

/// GET /api/v1/locations/top
pub async fn list_top_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LocationsResponse>, ApiError> {
    let locations = state
        .catalog()
        .list_top_locations()
        .map_err(location_error)?;
    Ok(Json(LocationsResponse { locations }))
}

/// GET /api/v1/locations/children/{id}
pub async fn list_children(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<LocationsResponse>, ApiError> {
    let locations = state.catalog().list_children(id).map_err(location_error)?;
    Ok(Json(LocationsResponse { locations }))
}

/// GET /api/v1/locations/{id}
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<Location>, ApiError> {
    state
        .catalog()
        .get_location(id)
        .map(Json)
        .map_err(location_error)
}

/// GET /api/v1/locations/{id}/path
///
/// Root-first chain ending at the location itself.
pub async fn location_path(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<PathResponse>, ApiError> {
    let path = state.catalog().location_path(id).map_err(location_error)?;
    Ok(Json(PathResponse { path }))
}

/// GET /api/v1/locations/{id}/descendants
///
/// The location and everything beneath it, breadth-first.
pub async fn descendants(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<DescendantsResponse>, ApiError> {
    let ids = state.catalog().descendant_ids(id).map_err(location_error)?;
    Ok(Json(DescendantsResponse { ids }))
}

/// GET /api/v1/locations/{id}/games
pub async fn games_at(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<LocationGamesResponse>, ApiError> {
    let games = state.catalog().list_games_at(id).map_err(location_error)?;
    Ok(Json(LocationGamesResponse { games }))
}

// ============================================================================
// Admin handlers
// ============================================================================

/// POST /api/v1/locations
pub async fn create_location(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Json(body): Json<CreateLocationBody>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = state
        .catalog()
        .create_location(&body.name, body.parent_id, body.kind.as_deref())
        .map_err(location_error)?;

    info!(
        location_id = location.id,
        user_id = %identity.user_id,
        "Location created via API"
    );
    Ok((StatusCode::CREATED, Json(location)))
}

/// PATCH /api/v1/locations/{id}
pub async fn rename_location(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
    Json(body): Json<RenameLocationBody>,
) -> Result<Json<Location>, ApiError> {
    state
        .catalog()
        .rename_location(id, &body.name)
        .map(Json)
        .map_err(location_error)
}

/// DELETE /api/v1/locations/{id}
///
/// Only empty leaf locations are deleted. A blocked delete answers 400
/// (404 when the location is missing) with the blocking counts.
pub async fn delete_location(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    IdPath(id): IdPath,
) -> Result<Json<DeleteResponse>, Response> {
    let outcome = state
        .catalog()
        .delete_location(id)
        .map_err(|e| location_error(e).into_response())?;

    match outcome.reason() {
        None => {
            info!(location_id = id, user_id = %identity.user_id, "Location deleted via API");
            Ok(Json(DeleteResponse { outcome }))
        }
        Some(reason) => {
            let status = match outcome {
                DeleteOutcome::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            let body = DeleteBlockedResponse {
                outcome,
                error: ErrorResponse {
                    error: reason,
                    field: None,
                },
            };
            Err((status, Json(body)).into_response())
        }
    }
}

/// POST /api/v1/locations/migrate
///
/// Move every game directly at `from_id` to `to_id`.
pub async fn migrate_games(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Json(body): Json<MigrateBody>,
) -> Result<Json<MigrateResponse>, ApiError> {
    let migrated = state
        .catalog()
        .migrate_games(body.from_id, body.to_id)
        .map_err(location_error)?;

    info!(
        from_id = body.from_id,
        to_id = body.to_id,
        migrated,
        user_id = %identity.user_id,
        "Games migrated via API"
    );
    Ok(Json(MigrateResponse { migrated }))
}
