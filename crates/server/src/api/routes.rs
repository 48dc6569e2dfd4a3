use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{entities, games, handlers, locations, search, stats};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Search
        .route("/search", get(search::search_games))
        .route("/search/suggest/{kind}", get(search::suggest))
        // Locations
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route("/locations/top", get(locations::list_top_locations))
        .route("/locations/migrate", post(locations::migrate_games))
        .route("/locations/children/{id}", get(locations::list_children))
        .route(
            "/locations/{id}",
            get(locations::get_location)
                .patch(locations::rename_location)
                .delete(locations::delete_location),
        )
        .route("/locations/{id}/path", get(locations::location_path))
        .route("/locations/{id}/descendants", get(locations::descendants))
        .route("/locations/{id}/games", get(locations::games_at))
        // Games
        .route("/games", post(games::create_game))
        .route(
            "/games/{id}",
            get(games::get_game)
                .patch(games::update_game)
                .delete(games::delete_game),
        )
        .route("/games/{id}/location-path", get(games::game_location_path))
        // Stats
        .route("/stats/overview", get(stats::overview))
        .route("/stats/health", get(stats::health))
        .route("/stats/health/{metric}", get(stats::health_details))
        .route("/stats/refresh", post(stats::refresh))
        // Facet entities
        .route(
            "/entities/{kind}",
            get(entities::list_entities).post(entities::create_entity),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
