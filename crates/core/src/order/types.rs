//! Core order and delivery data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Actors
// ============================================================================

/// Role of the user attempting an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Places orders and tracks deliveries.
    Customer,
    /// Restaurant staff, drives the kitchen-side transitions.
    RestaurantStaff,
    /// Delivery person, drives the delivery-side transitions.
    Courier,
    /// May apply any transition.
    Admin,
}

impl Role {
    /// Returns the role as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::RestaurantStaff => "restaurant_staff",
            Role::Courier => "courier",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "restaurant_staff" => Some(Role::RestaurantStaff),
            "courier" => Some(Role::Courier),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated identity attempting a lifecycle operation.
///
/// Authentication itself is an external collaborator; by the time an actor
/// reaches this crate it is already trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// How the order is fulfilled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMode {
    Pickup,
    Delivery,
    DineIn,
}

impl FulfillmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentMode::Pickup => "pickup",
            FulfillmentMode::Delivery => "delivery",
            FulfillmentMode::DineIn => "dine_in",
        }
    }

    /// Parse a mode from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pickup" => Some(FulfillmentMode::Pickup),
            "delivery" => Some(FulfillmentMode::Delivery),
            "dine_in" => Some(FulfillmentMode::DineIn),
            _ => None,
        }
    }
}

/// Current status of an order.
///
/// The status flow is linear with no branching back:
/// ```text
/// pending -> preparing -> ready -> delivering -> delivered
/// ```
/// `cancelled` is reachable from any non-terminal status. `delivered` and
/// `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// The single legal successor in the forward flow, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Delivering),
            OrderStatus::Delivering => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Returns the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "delivering" => Some(OrderStatus::Delivering),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// A single line item on an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Menu item reference.
    pub menu_item_id: String,
    /// Quantity, always >= 1.
    pub quantity: u32,
    /// Unit price in cents.
    pub unit_price_cents: u64,
    /// Optional free-text preference ("no onions").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference: Option<String>,
}

impl OrderItem {
    pub fn new(menu_item_id: impl Into<String>, quantity: u32, unit_price_cents: u64) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            quantity,
            unit_price_cents,
            preference: None,
        }
    }

    /// Set a free-text preference.
    pub fn with_preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    /// Line total in cents.
    pub fn total_cents(&self) -> u64 {
        self.unit_price_cents * self.quantity as u64
    }
}

/// An order placed by a customer.
///
/// Created atomically with its line items at checkout. After creation the
/// status is the only field that changes; orders are never hard-deleted,
/// only status-terminated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique identifier (UUID).
    pub id: String,

    /// Customer who placed the order.
    pub customer_id: String,

    /// Restaurant the order was placed at.
    pub restaurant_id: String,

    /// Ordered line items.
    pub items: Vec<OrderItem>,

    /// Total price in cents. Equals the sum of line totals at creation.
    pub total_cents: u64,

    /// How the order is fulfilled.
    pub mode: FulfillmentMode,

    /// Current status.
    pub status: OrderStatus,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// Last status-change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of line totals.
    pub fn items_total_cents(&self) -> u64 {
        self.items.iter().map(OrderItem::total_cents).sum()
    }
}

// ============================================================================
// Deliveries
// ============================================================================

/// Current status of a delivery.
///
/// ```text
/// pending -> assigned -> on_route -> delivered
/// ```
/// The status never regresses. `delivered` is terminal and is reached no
/// earlier than the parent order's `delivering` status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    OnRoute,
    Delivered,
}

impl DeliveryStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }

    /// The single legal successor, if any.
    pub fn next(&self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Pending => Some(DeliveryStatus::Assigned),
            DeliveryStatus::Assigned => Some(DeliveryStatus::OnRoute),
            DeliveryStatus::OnRoute => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => None,
        }
    }

    /// Returns the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::OnRoute => "on_route",
            DeliveryStatus::Delivered => "delivered",
        }
    }

    /// Parse a status from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "assigned" => Some(DeliveryStatus::Assigned),
            "on_route" => Some(DeliveryStatus::OnRoute),
            "delivered" => Some(DeliveryStatus::Delivered),
            _ => None,
        }
    }
}

/// A geographic position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns true if both coordinates are within valid ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// The delivery record for a delivery-mode order.
///
/// Exactly one per order whose fulfillment mode is `delivery`, created when
/// the restaurant accepts the order. The courier position is overwritten on
/// every report while `on_route` and is only meaningful in that status. The
/// record becomes immutable once `delivered`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    /// Unique identifier (UUID).
    pub id: String,

    /// The order this delivery belongs to.
    pub order_id: String,

    /// Assigned courier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,

    /// Current status.
    pub status: DeliveryStatus,

    /// Last known courier position, if any has been reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_position: Option<Position>,

    /// Last status- or position-change timestamp.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Tracking snapshot
// ============================================================================

/// A point-in-time read of an order and its delivery, used to drive the
/// tracking display. Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingSnapshot {
    /// The order being tracked.
    pub order_id: String,

    /// Order status at capture time.
    pub order_status: OrderStatus,

    /// Delivery status at capture time, if the order has a delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,

    /// Last known courier position, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_position: Option<Position>,

    /// Consumer device position at capture time, if known. Supplied by an
    /// external geolocation collaborator, not fetched by this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_position: Option<Position>,

    /// When this snapshot was captured. Used for last-write-wins ordering
    /// when refreshes race.
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_forward_chain() {
        assert_eq!(OrderStatus::Pending.next(), Some(OrderStatus::Preparing));
        assert_eq!(OrderStatus::Preparing.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::Delivering));
        assert_eq!(OrderStatus::Delivering.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_order_status_terminality() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Delivering.is_terminal());
    }

    #[test]
    fn test_order_status_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Ready.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_order_status_wire_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("unknown"), None);
    }

    #[test]
    fn test_fulfillment_mode_wire_round_trip() {
        for mode in [
            FulfillmentMode::Pickup,
            FulfillmentMode::Delivery,
            FulfillmentMode::DineIn,
        ] {
            assert_eq!(FulfillmentMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(FulfillmentMode::parse("teleport"), None);
    }

    #[test]
    fn test_delivery_status_forward_chain() {
        assert_eq!(
            DeliveryStatus::Pending.next(),
            Some(DeliveryStatus::Assigned)
        );
        assert_eq!(
            DeliveryStatus::Assigned.next(),
            Some(DeliveryStatus::OnRoute)
        );
        assert_eq!(
            DeliveryStatus::OnRoute.next(),
            Some(DeliveryStatus::Delivered)
        );
        assert_eq!(DeliveryStatus::Delivered.next(), None);
    }

    #[test]
    fn test_position_validity() {
        assert!(Position::new(45.0, 9.0).is_valid());
        assert!(Position::new(-90.0, 180.0).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn test_order_item_totals() {
        let item = OrderItem::new("margherita", 3, 850);
        assert_eq!(item.total_cents(), 2550);
    }

    #[test]
    fn test_order_status_serialization_is_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Delivering).unwrap();
        assert_eq!(json, r#""delivering""#);
        let json = serde_json::to_string(&DeliveryStatus::OnRoute).unwrap();
        assert_eq!(json, r#""on_route""#);
    }

    #[test]
    fn test_snapshot_serialization_round_trip() {
        let snapshot = TrackingSnapshot {
            order_id: "o-1".to_string(),
            order_status: OrderStatus::Delivering,
            delivery_status: Some(DeliveryStatus::OnRoute),
            courier_position: Some(Position::new(45.46, 9.19)),
            consumer_position: Some(Position::new(45.48, 9.2)),
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TrackingSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_optional_fields_skipped() {
        let snapshot = TrackingSnapshot {
            order_id: "o-1".to_string(),
            order_status: OrderStatus::Pending,
            delivery_status: None,
            courier_position: None,
            consumer_position: None,
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("delivery_status"));
        assert!(!json.contains("courier_position"));
    }

    #[test]
    fn test_role_wire_round_trip() {
        for role in [
            Role::Customer,
            Role::RestaurantStaff,
            Role::Courier,
            Role::Admin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
