use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Collection
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route("/items/:id", axum::routing::delete(handlers::delete_item))
        .route("/items/:id/attributes", put(handlers::update_attributes))
        .route("/items/:id/wears", post(handlers::log_wear))
        // Analytics
        .route("/items/:id/usage", get(handlers::get_item_usage))
        .route("/usage", get(handlers::get_usage))
        .route("/insights", get(handlers::get_insights))
        // Similarity
        .route("/items/:id/similar", get(handlers::get_similar))
        .route("/similarity", get(handlers::get_similarity))
        // Recommendations
        .route("/recommendations", get(handlers::get_recommendations))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
