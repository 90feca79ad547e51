//! Snapshot acquisition for the tracking runner.
//!
//! The session itself never performs network I/O; it reacts to snapshots
//! handed to it. A [`SnapshotSource`] is the collaborator that produces
//! them, typically by polling the backend and merging in the consumer
//! position from the device's geolocation collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::order::{Position, TrackingSnapshot};

/// Errors produced while fetching snapshots.
#[derive(Debug, Clone, Error)]
pub enum TrackingError {
    /// Transient network/backend failure. Recovered by keeping the last good
    /// snapshot and retrying on the next scheduled refresh; never surfaced
    /// as a user-facing error.
    #[error("snapshot fetch failed: {0}")]
    Fetch(String),

    /// The backend no longer knows the order.
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

/// Produces authoritative tracking snapshots for one order.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<TrackingSnapshot, TrackingError>;
}

/// Supplies the consumer's current device position.
///
/// Backed by an external geolocation collaborator; `None` when the position
/// is not (yet) known.
pub trait PositionProvider: Send + Sync {
    fn current_position(&self) -> Option<Position>;
}

/// A position provider that always reports the same point. Useful for tests
/// and for consumers with a fixed delivery address.
pub struct FixedPositionProvider {
    position: Position,
}

impl FixedPositionProvider {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            position: Position::new(lat, lon),
        }
    }
}

impl PositionProvider for FixedPositionProvider {
    fn current_position(&self) -> Option<Position> {
        Some(self.position)
    }
}

/// Polls the backend tracking endpoint over HTTP and merges in the consumer
/// position.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    base_url: String,
    order_id: String,
    position: Arc<dyn PositionProvider>,
}

impl HttpSnapshotSource {
    pub fn new(
        base_url: impl Into<String>,
        order_id: impl Into<String>,
        position: Arc<dyn PositionProvider>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            order_id: order_id.into(),
            position,
        }
    }

    fn tracking_url(&self) -> String {
        format!(
            "{}/api/v1/orders/{}/tracking",
            self.base_url.trim_end_matches('/'),
            self.order_id
        )
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<TrackingSnapshot, TrackingError> {
        let response = self
            .client
            .get(self.tracking_url())
            .send()
            .await
            .map_err(|e| TrackingError::Fetch(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TrackingError::OrderNotFound(self.order_id.clone()));
        }
        if !response.status().is_success() {
            return Err(TrackingError::Fetch(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let mut snapshot: TrackingSnapshot = response
            .json()
            .await
            .map_err(|e| TrackingError::Fetch(e.to_string()))?;

        // The backend does not know where the consumer's device is; that is
        // merged in here, at the moment of computation.
        if snapshot.consumer_position.is_none() {
            snapshot.consumer_position = self.position.current_position();
        }

        Ok(snapshot)
    }
}
