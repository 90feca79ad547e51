//! Order API handlers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use pronto_core::{
    CreateOrderRequest, FulfillmentMode, Order, OrderFilter, OrderItem, OrderStatus,
    TrackingSnapshot, TransitionRecord,
};

use super::{actor_from_headers, error, store_error, ApiError};
use crate::state::AppState;

/// Maximum allowed limit for order queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for order queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating an order at checkout
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub restaurant_id: String,
    pub items: Vec<OrderItemBody>,
    pub mode: FulfillmentMode,
}

/// Line item in a create request
#[derive(Debug, Deserialize)]
pub struct OrderItemBody {
    pub menu_item_id: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
    pub preference: Option<String>,
}

/// Query parameters for listing orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    /// Filter by status
    pub status: Option<String>,
    /// Filter by customer
    pub customer_id: Option<String>,
    /// Maximum number of orders to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Request body for a status transition
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub status: String,
}

/// Response for order operations
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub restaurant_id: String,
    pub items: Vec<OrderItem>,
    pub total_cents: u64,
    pub mode: FulfillmentMode,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            items: order.items,
            total_cents: order.total_cents,
            mode: order.mode,
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing orders
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for the transition log
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<TransitionRecord>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new order (customer checkout)
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let actor = actor_from_headers(&headers)?;

    let items = body
        .items
        .into_iter()
        .map(|item| {
            let mut out = OrderItem::new(item.menu_item_id, item.quantity, item.unit_price_cents);
            if let Some(preference) = item.preference {
                out = out.with_preference(preference);
            }
            out
        })
        .collect();

    let request = CreateOrderRequest {
        customer_id: actor.user_id,
        restaurant_id: body.restaurant_id,
        items,
        mode: body.mode,
    };

    let order = state
        .order_store()
        .create_order(request)
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Get an order by ID
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    match state.order_store().get_order(&id) {
        Ok(Some(order)) => Ok(Json(OrderResponse::from(order))),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("Order not found: {}", id),
        )),
        Err(e) => Err(store_error(e)),
    }
}

/// List orders with optional filters
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = OrderFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status = OrderStatus::parse(status)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, format!("unknown status: {}", status)))?;
        filter = filter.with_status(status);
    }

    if let Some(ref customer_id) = params.customer_id {
        filter = filter.with_customer(customer_id);
    }

    let orders = state
        .order_store()
        .list_orders(&filter)
        .map_err(store_error)?;

    let count_filter = OrderFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter
    };
    let total = state
        .order_store()
        .count_orders(&count_filter)
        .map_err(store_error)?;

    Ok(Json(ListOrdersResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Apply an order status transition
pub async fn transition_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TransitionBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let target = OrderStatus::parse(&body.status).ok_or_else(|| {
        error(
            StatusCode::BAD_REQUEST,
            format!("unknown status: {}", body.status),
        )
    })?;

    let order = state
        .order_store()
        .transition_order(&id, target, &actor)
        .map_err(store_error)?;

    Ok(Json(OrderResponse::from(order)))
}

/// Point-in-time tracking snapshot for an order
pub async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrackingSnapshot>, ApiError> {
    state
        .order_store()
        .snapshot(&id)
        .map(Json)
        .map_err(store_error)
}

/// Recorded status transitions for an order
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = state
        .order_store()
        .transition_log(&id)
        .map_err(store_error)?;
    Ok(Json(EventsResponse { events }))
}
