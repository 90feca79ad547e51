pub mod config;
pub mod geo;
pub mod order;
pub mod testing;
pub mod tracking;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig, TrackingConfig,
};
pub use order::{
    Actor, CreateOrderRequest, Delivery, DeliveryStatus, FulfillmentMode, LifecycleError, Order,
    OrderFilter, OrderItem, OrderStatus, OrderStore, Position, Role, SqliteOrderStore, StoreError,
    TrackingSnapshot, TransitionRecord,
};
pub use tracking::{
    DisplayState, FixedPositionProvider, HttpSnapshotSource, PositionProvider, SnapshotSource,
    TrackingError, TrackingRunner, TrackingSession,
};
