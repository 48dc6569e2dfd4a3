//! Facet entity API handlers (platforms, genres, tags, companies, ...).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use gamecubby_core::{EntityKind, GameCatalog, NamedEntity};

use super::error::{api_error, catalog_error, ApiError};
use super::middleware::AdminUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEntityBody {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub kind: EntityKind,
    pub items: Vec<NamedEntity>,
}

fn parse_kind(kind: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_plural(kind)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Unknown entity kind: {kind}")))
}

/// GET /api/v1/entities/{kind}
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<EntitiesResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let items = state.catalog().list_entities(kind).map_err(catalog_error)?;
    Ok(Json(EntitiesResponse { kind, items }))
}

/// POST /api/v1/entities/{kind}
///
/// Returns the existing entity when the name is taken.
pub async fn create_entity(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(kind): Path<String>,
    Json(body): Json<CreateEntityBody>,
) -> Result<(StatusCode, Json<NamedEntity>), ApiError> {
    let kind = parse_kind(&kind)?;
    let entity = state
        .catalog()
        .create_entity(kind, &body.name)
        .map_err(catalog_error)?;
    Ok((StatusCode::CREATED, Json(entity)))
}
