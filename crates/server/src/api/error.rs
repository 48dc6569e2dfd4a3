//! Mapping of core errors to HTTP responses.

use axum::{
    extract::{rejection::PathRejection, FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::error;

use gamecubby_core::{CatalogError, LocationError, SearchError, StatsError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Offending request parameter, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            field: None,
        }),
    )
}

fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: message.into(),
            field: Some(field.to_string()),
        }),
    )
}

/// Integer `{id}` path segment whose rejection is the JSON [`ErrorResponse`]
/// instead of axum's plain-text body.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| IdPath(id))
            .map_err(path_error)
    }
}

fn path_error(rejection: PathRejection) -> ApiError {
    let status = rejection.status();
    let field = (status == StatusCode::BAD_REQUEST).then(|| "id".to_string());
    (
        status,
        Json(ErrorResponse {
            error: rejection.body_text(),
            field,
        }),
    )
}

pub fn catalog_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        CatalogError::InvalidInput(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        CatalogError::Database(_) | CatalogError::Internal(_) => {
            error!(error = %e, "Catalog failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub fn search_error(e: SearchError) -> ApiError {
    match e {
        SearchError::Validation { field, message } => {
            let text = format!("Invalid parameter '{field}': {message}");
            validation_error(&field, text)
        }
        SearchError::NoFilters => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        SearchError::Catalog(e) => catalog_error(e),
    }
}

pub fn location_error(e: LocationError) -> ApiError {
    match e {
        LocationError::NotFound(_)
        | LocationError::ParentNotFound(_)
        | LocationError::GameNotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        LocationError::EmptyName | LocationError::SameLocation | LocationError::TargetNotFound(_) => {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        LocationError::Catalog(e) => catalog_error(e),
    }
}

pub fn stats_error(e: StatsError) -> ApiError {
    match e {
        StatsError::UnknownMetric(_) => validation_error("metric", e.to_string()),
        StatsError::Catalog(e) => catalog_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            search_error(SearchError::validation("tag_ids", "must be integers")).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(search_error(SearchError::NoFilters).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            location_error(LocationError::SameLocation).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            location_error(LocationError::NotFound(3)).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            stats_error(StatsError::UnknownMetric("x".to_string())).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            catalog_error(CatalogError::Database("disk".to_string())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_names_field() {
        let (_, Json(body)) = search_error(SearchError::validation("year", "must be an integer"));
        assert_eq!(body.field.as_deref(), Some("year"));
        assert!(body.error.contains("year"));
    }
}
