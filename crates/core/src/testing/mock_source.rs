//! Mock snapshot source for tracking tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::order::{DeliveryStatus, OrderStatus, Position, TrackingSnapshot};
use crate::tracking::{SnapshotSource, TrackingError};

/// A programmable [`SnapshotSource`].
///
/// Responses are consumed from a queue; when the queue runs dry the last
/// queued snapshot is repeated, which matches a backend whose state has
/// stopped changing.
pub struct MockSnapshotSource {
    queue: Mutex<VecDeque<Result<TrackingSnapshot, TrackingError>>>,
    last: Mutex<Option<TrackingSnapshot>>,
    fetch_count: AtomicUsize,
}

impl Default for MockSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSnapshotSource {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Queue a snapshot to be returned by the next unanswered fetch.
    pub fn push_snapshot(&self, snapshot: TrackingSnapshot) {
        self.queue.lock().unwrap().push_back(Ok(snapshot));
    }

    /// Queue a fetch failure.
    pub fn push_error(&self, error: TrackingError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Number of fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    async fn fetch(&self) -> Result<TrackingSnapshot, TrackingError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            if let Ok(ref snapshot) = next {
                *self.last.lock().unwrap() = Some(snapshot.clone());
            }
            return next;
        }

        match self.last.lock().unwrap().clone() {
            // Repeat the last snapshot with a fresh capture time, like a
            // backend whose state has not changed between polls.
            Some(mut snapshot) => {
                snapshot.captured_at = Utc::now();
                Ok(snapshot)
            }
            None => Err(TrackingError::Fetch("no snapshot queued".to_string())),
        }
    }
}

/// Snapshot builders shared by tracking tests.
pub mod fixtures {
    use super::*;

    /// An on-route snapshot with courier and consumer ~1.3 km apart.
    pub fn on_route(order_id: &str) -> TrackingSnapshot {
        TrackingSnapshot {
            order_id: order_id.to_string(),
            order_status: OrderStatus::Delivering,
            delivery_status: Some(DeliveryStatus::OnRoute),
            courier_position: Some(Position::new(45.4642, 9.19)),
            consumer_position: Some(Position::new(45.4762, 9.19)),
            captured_at: Utc::now(),
        }
    }

    /// A snapshot for a delivery that has completed.
    pub fn delivered(order_id: &str) -> TrackingSnapshot {
        TrackingSnapshot {
            order_id: order_id.to_string(),
            order_status: OrderStatus::Delivered,
            delivery_status: Some(DeliveryStatus::Delivered),
            courier_position: Some(Position::new(45.4762, 9.19)),
            consumer_position: Some(Position::new(45.4762, 9.19)),
            captured_at: Utc::now(),
        }
    }

    /// A snapshot for an order still waiting on the kitchen.
    pub fn awaiting_pickup(order_id: &str) -> TrackingSnapshot {
        TrackingSnapshot {
            order_id: order_id.to_string(),
            order_status: OrderStatus::Preparing,
            delivery_status: Some(DeliveryStatus::Assigned),
            courier_position: None,
            consumer_position: Some(Position::new(45.4762, 9.19)),
            captured_at: Utc::now(),
        }
    }
}
