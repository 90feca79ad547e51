use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{deliveries, handlers, orders};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Orders
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", put(orders::transition_order))
        .route("/orders/{id}/delivery", get(deliveries::get_order_delivery))
        .route("/orders/{id}/tracking", get(orders::get_tracking))
        .route("/orders/{id}/events", get(orders::get_events))
        // Deliveries
        .route("/deliveries/{id}", get(deliveries::get_delivery))
        .route("/deliveries/{id}/status", put(deliveries::transition_delivery))
        .route("/deliveries/{id}/position", put(deliveries::record_position))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
