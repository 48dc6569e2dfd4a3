//! Game API handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use gamecubby_core::{
    GameCatalog, GameDetail, GameUpdate, LocationPathEntry, LocationStore, NewGame,
};

use super::error::{catalog_error, location_error, ApiError, IdPath, SuccessResponse};
use super::middleware::AdminUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GameLocationPathResponse {
    pub game_id: i64,
    pub path: Vec<LocationPathEntry>,
}

/// GET /api/v1/games/{id}
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<GameDetail>, ApiError> {
    state.catalog().get_game(id).map(Json).map_err(catalog_error)
}

/// GET /api/v1/games/{id}/location-path
///
/// Empty path when the game has no location.
pub async fn game_location_path(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<GameLocationPathResponse>, ApiError> {
    let path = state
        .catalog()
        .game_location_path(id)
        .map_err(location_error)?;
    Ok(Json(GameLocationPathResponse { game_id: id, path }))
}

/// POST /api/v1/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Json(body): Json<NewGame>,
) -> Result<(StatusCode, Json<GameDetail>), ApiError> {
    let game = state.catalog().create_game(&body).map_err(catalog_error)?;

    info!(
        game_id = game.game.id,
        user_id = %identity.user_id,
        "Game created via API"
    );
    Ok((StatusCode::CREATED, Json(game)))
}

/// PATCH /api/v1/games/{id}
pub async fn update_game(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
    Json(body): Json<GameUpdate>,
) -> Result<Json<GameDetail>, ApiError> {
    state
        .catalog()
        .update_game(id, &body)
        .map(Json)
        .map_err(catalog_error)
}

/// DELETE /api/v1/games/{id}
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    IdPath(id): IdPath,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.catalog().delete_game(id).map_err(catalog_error)?;

    info!(game_id = id, user_id = %identity.user_id, "Game deleted via API");
    Ok(Json(SuccessResponse {
        message: format!("Game {id} deleted"),
    }))
}
