//! HTTP server for the order and delivery tracking service.

pub mod api;
pub mod state;
