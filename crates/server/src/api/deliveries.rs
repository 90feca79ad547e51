//! Delivery API handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pronto_core::{Delivery, DeliveryStatus, Position};

use super::{actor_from_headers, error, store_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a delivery status transition. `courier_id` names the
/// courier on assignment; couriers may omit it to claim the delivery.
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub status: String,
    #[serde(default)]
    pub courier_id: Option<String>,
}

/// Request body for a courier position report
#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub lat: f64,
    pub lon: f64,
}

/// Response for delivery operations
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub id: String,
    pub order_id: String,
    pub courier_id: Option<String>,
    pub status: DeliveryStatus,
    pub courier_position: Option<Position>,
    pub updated_at: String,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            id: delivery.id,
            order_id: delivery.order_id,
            courier_id: delivery.courier_id,
            status: delivery.status,
            courier_position: delivery.courier_position,
            updated_at: delivery.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the delivery attached to an order
pub async fn get_order_delivery(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    match state.order_store().get_delivery_for_order(&order_id) {
        Ok(Some(delivery)) => Ok(Json(DeliveryResponse::from(delivery))),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("No delivery for order: {}", order_id),
        )),
        Err(e) => Err(store_error(e)),
    }
}

/// Get a delivery by ID
pub async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    match state.order_store().get_delivery(&id) {
        Ok(Some(delivery)) => Ok(Json(DeliveryResponse::from(delivery))),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("Delivery not found: {}", id),
        )),
        Err(e) => Err(store_error(e)),
    }
}

/// Apply a delivery status transition
pub async fn transition_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TransitionBody>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let target = DeliveryStatus::parse(&body.status).ok_or_else(|| {
        error(
            StatusCode::BAD_REQUEST,
            format!("unknown status: {}", body.status),
        )
    })?;

    let delivery = state
        .order_store()
        .transition_delivery(&id, target, &actor, body.courier_id.as_deref())
        .map_err(store_error)?;

    Ok(Json(DeliveryResponse::from(delivery)))
}

/// Record a courier position report
pub async fn record_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PositionBody>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    // Only couriers and admins report positions.
    let actor = actor_from_headers(&headers)?;
    if !matches!(
        actor.role,
        pronto_core::Role::Courier | pronto_core::Role::Admin
    ) {
        return Err(error(
            StatusCode::FORBIDDEN,
            "only couriers can report positions".to_string(),
        ));
    }

    let delivery = state
        .order_store()
        .record_position(&id, body.lat, body.lon)
        .map_err(store_error)?;

    Ok(Json(DeliveryResponse::from(delivery)))
}
