//! Order and delivery domain: data model, lifecycle state machine, storage.

mod lifecycle;
mod sqlite_store;
mod store;
mod types;

pub use lifecycle::{
    record_courier_position, transition_delivery, transition_order, LifecycleError,
};
pub use sqlite_store::SqliteOrderStore;
pub use store::{CreateOrderRequest, OrderFilter, OrderStore, StoreError, TransitionRecord};
pub use types::{
    Actor, Delivery, DeliveryStatus, FulfillmentMode, Order, OrderItem, OrderStatus, Position,
    Role, TrackingSnapshot,
};
