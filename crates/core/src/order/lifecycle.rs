//! The order and delivery lifecycle state machine.
//!
//! This module is the single authority on which status transitions are legal
//! and which role may apply them. Every caller, HTTP handler or background
//! task, goes through the same table; a transition that fails here must not
//! mutate anything.

use chrono::Utc;
use thiserror::Error;

use super::types::{Actor, Delivery, DeliveryStatus, Order, OrderStatus, Position, Role};

/// Errors produced by lifecycle validation.
#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    /// The target status is not reachable from the current one.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A precondition for the operation is unmet.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// The actor's role is not allowed to apply this transition.
    #[error("role {role} may not transition {from} -> {to}")]
    Unauthorized {
        role: String,
        from: String,
        to: String,
    },

    /// Coordinates outside the valid lat/lon ranges.
    #[error("invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

impl LifecycleError {
    fn invalid_transition(from: &str, to: &str) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    fn unauthorized(role: Role, from: &str, to: &str) -> Self {
        Self::Unauthorized {
            role: role.as_str().to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Returns true if `actor` may drive the given order edge.
///
/// Restaurant staff own the kitchen side (pending -> preparing -> ready),
/// couriers own the delivery side (ready -> delivering -> delivered), admins
/// may apply anything, and any role may cancel a non-terminal order.
fn order_edge_allowed(role: Role, from: OrderStatus, to: OrderStatus) -> bool {
    if role == Role::Admin {
        return true;
    }
    if to == OrderStatus::Cancelled {
        return true;
    }
    match (from, to) {
        (OrderStatus::Pending, OrderStatus::Preparing)
        | (OrderStatus::Preparing, OrderStatus::Ready) => role == Role::RestaurantStaff,
        (OrderStatus::Ready, OrderStatus::Delivering)
        | (OrderStatus::Delivering, OrderStatus::Delivered) => role == Role::Courier,
        _ => false,
    }
}

/// Returns true if `actor` may drive the given delivery edge.
///
/// Assignment is done by restaurant staff (handing the order to a courier) or
/// by the courier claiming it; movement and completion belong to the courier.
fn delivery_edge_allowed(role: Role, from: DeliveryStatus, to: DeliveryStatus) -> bool {
    if role == Role::Admin {
        return true;
    }
    match (from, to) {
        (DeliveryStatus::Pending, DeliveryStatus::Assigned) => {
            matches!(role, Role::RestaurantStaff | Role::Courier)
        }
        (DeliveryStatus::Assigned, DeliveryStatus::OnRoute)
        | (DeliveryStatus::OnRoute, DeliveryStatus::Delivered) => role == Role::Courier,
        _ => false,
    }
}

/// Validate and apply an order status transition.
///
/// Rejects any target that is not the single legal successor of the current
/// status, with `cancelled` allowed from any non-terminal status. Repeating
/// the current status is rejected like any other illegal target. On success
/// returns the updated order with a fresh `updated_at`; on failure nothing
/// is mutated.
pub fn transition_order(
    order: &Order,
    target: OrderStatus,
    actor: &Actor,
) -> Result<Order, LifecycleError> {
    let from = order.status;

    let legal = if target == OrderStatus::Cancelled {
        from.can_cancel()
    } else {
        from.next() == Some(target)
    };

    if !legal {
        return Err(LifecycleError::invalid_transition(
            from.as_str(),
            target.as_str(),
        ));
    }

    if !order_edge_allowed(actor.role, from, target) {
        return Err(LifecycleError::unauthorized(
            actor.role,
            from.as_str(),
            target.as_str(),
        ));
    }

    let mut updated = order.clone();
    updated.status = target;
    updated.updated_at = Utc::now();
    Ok(updated)
}

/// Validate and apply a delivery status transition.
///
/// Same discipline as [`transition_order`], with two extra preconditions on
/// `on_route -> delivered`: the courier must have reported a position at
/// least once, and the parent order must have reached `delivering` (delivery-
/// side progress cannot outrun pickup).
///
/// `courier` names the courier being attached on `pending -> assigned`. When
/// absent, a courier actor claims the delivery for themselves; anyone else
/// must name one or the assignment is rejected.
pub fn transition_delivery(
    delivery: &Delivery,
    target: DeliveryStatus,
    actor: &Actor,
    order: &Order,
    courier: Option<&str>,
) -> Result<Delivery, LifecycleError> {
    let from = delivery.status;

    if from.next() != Some(target) {
        return Err(LifecycleError::invalid_transition(
            from.as_str(),
            target.as_str(),
        ));
    }

    if !delivery_edge_allowed(actor.role, from, target) {
        return Err(LifecycleError::unauthorized(
            actor.role,
            from.as_str(),
            target.as_str(),
        ));
    }

    if target == DeliveryStatus::Delivered {
        if delivery.courier_position.is_none() {
            return Err(LifecycleError::invalid_state(
                "cannot mark delivered: no courier position was ever recorded",
            ));
        }
        if !matches!(
            order.status,
            OrderStatus::Delivering | OrderStatus::Delivered
        ) {
            return Err(LifecycleError::invalid_state(format!(
                "cannot mark delivered: parent order is still {}",
                order.status.as_str()
            )));
        }
    }

    let mut updated = delivery.clone();
    updated.status = target;
    if target == DeliveryStatus::Assigned {
        match courier {
            Some(id) => updated.courier_id = Some(id.to_string()),
            None if updated.courier_id.is_some() => {}
            None if actor.role == Role::Courier => {
                updated.courier_id = Some(actor.user_id.clone());
            }
            None => {
                return Err(LifecycleError::invalid_state(
                    "cannot assign delivery: no courier named and actor is not a courier",
                ));
            }
        }
    }
    updated.updated_at = Utc::now();
    Ok(updated)
}

/// Record a courier position report.
///
/// Only legal while the delivery is `on_route`; overwrites the last known
/// position. Position history, if needed, is an external concern.
pub fn record_courier_position(
    delivery: &Delivery,
    lat: f64,
    lon: f64,
) -> Result<Delivery, LifecycleError> {
    let position = Position::new(lat, lon);
    if !position.is_valid() {
        return Err(LifecycleError::InvalidCoordinates { lat, lon });
    }

    if delivery.status != DeliveryStatus::OnRoute {
        return Err(LifecycleError::invalid_state(format!(
            "cannot record position: delivery is {}, not on_route",
            delivery.status.as_str()
        )));
    }

    let mut updated = delivery.clone();
    updated.courier_position = Some(position);
    updated.updated_at = Utc::now();
    Ok(updated)
}
