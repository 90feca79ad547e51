//! Order storage trait and request/filter types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lifecycle::LifecycleError;
use super::types::{
    Actor, Delivery, DeliveryStatus, FulfillmentMode, Order, OrderItem, OrderStatus,
    TrackingSnapshot,
};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Order or delivery not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The status changed under us between read and write. Another actor's
    /// transition won; the caller may re-read and retry with a legal target.
    #[error("concurrent update lost for {0}")]
    Conflict(String),

    /// Lifecycle validation rejected the operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Invalid request payload (bad quantity, total mismatch).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Request to create a new order at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Customer placing the order.
    pub customer_id: String,
    /// Restaurant the order is placed at.
    pub restaurant_id: String,
    /// Line items, at least one, each with quantity >= 1.
    pub items: Vec<OrderItem>,
    /// How the order is fulfilled.
    pub mode: FulfillmentMode,
}

/// Filter for querying orders.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    /// Filter by status.
    pub status: Option<OrderStatus>,
    /// Filter by customer.
    pub customer_id: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            customer_id: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by status.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by customer.
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// One recorded status transition, for audit and ETA baselines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionRecord {
    /// "order" or "delivery".
    pub entity: String,
    /// Id of the order or delivery.
    pub entity_id: String,
    /// Order the transition belongs to, for both entity kinds.
    pub order_id: String,
    pub from_status: String,
    pub to_status: String,
    pub actor_id: String,
    pub actor_role: String,
    pub at: DateTime<Utc>,
}

/// Trait for order storage backends.
///
/// Status transitions go through the lifecycle table and are applied with a
/// compare-and-swap on the current status, so two actors racing on the same
/// row cannot both win.
pub trait OrderStore: Send + Sync {
    /// Create a new order atomically with its line items.
    fn create_order(&self, request: CreateOrderRequest) -> Result<Order, StoreError>;

    /// Get an order by id.
    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// List orders matching the filter, newest first.
    fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Count orders matching the filter.
    fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError>;

    /// Apply an order status transition on behalf of `actor`.
    ///
    /// Accepting a delivery-mode order (pending -> preparing) creates its
    /// Delivery row.
    fn transition_order(
        &self,
        id: &str,
        target: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, StoreError>;

    /// Get a delivery by id.
    fn get_delivery(&self, id: &str) -> Result<Option<Delivery>, StoreError>;

    /// Get the delivery attached to an order, if any.
    fn get_delivery_for_order(&self, order_id: &str) -> Result<Option<Delivery>, StoreError>;

    /// Apply a delivery status transition on behalf of `actor`. On
    /// assignment, `courier` names the courier to attach; couriers may omit
    /// it to claim the delivery themselves.
    fn transition_delivery(
        &self,
        id: &str,
        target: DeliveryStatus,
        actor: &Actor,
        courier: Option<&str>,
    ) -> Result<Delivery, StoreError>;

    /// Record a courier position report for an on-route delivery.
    fn record_position(&self, id: &str, lat: f64, lon: f64) -> Result<Delivery, StoreError>;

    /// Joined point-in-time read of an order and its delivery. The consumer
    /// position is not known to the store and is left empty.
    fn snapshot(&self, order_id: &str) -> Result<TrackingSnapshot, StoreError>;

    /// Recorded transitions for an order (and its delivery), oldest first.
    fn transition_log(&self, order_id: &str) -> Result<Vec<TransitionRecord>, StoreError>;
}

/// Validate a create request against the creation invariants.
pub(crate) fn validate_create_request(request: &CreateOrderRequest) -> Result<(), StoreError> {
    if request.items.is_empty() {
        return Err(StoreError::InvalidRequest(
            "order must have at least one line item".to_string(),
        ));
    }
    for item in &request.items {
        if item.quantity < 1 {
            return Err(StoreError::InvalidRequest(format!(
                "line item {} has quantity 0",
                item.menu_item_id
            )));
        }
    }
    Ok(())
}
