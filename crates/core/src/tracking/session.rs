//! Live tracking session for one active delivery.
//!
//! A session holds the last authoritative snapshot and a locally ticking
//! countdown. Snapshots arrive on the refresh cadence and reset the countdown
//! baseline; ticks run every second in between so the on-screen timer
//! decreases smoothly instead of jumping when a refresh lands. The freshly
//! computed server-side estimate always wins over local drift.

use serde::{Deserialize, Serialize};

use crate::geo;
use crate::order::{DeliveryStatus, OrderStatus, TrackingSnapshot};

/// What the tracking consumer should display right now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayState {
    /// Delivery exists but is not trackable yet (or the order has no
    /// delivery at all): assigned, awaiting pickup, and so on.
    Waiting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delivery_status: Option<DeliveryStatus>,
    },

    /// Courier is on route and both positions are known.
    Tracking {
        distance_km: f64,
        eta_seconds: u64,
        countdown: String,
    },

    /// The delivery completed (terminal).
    Completed,

    /// The order was cancelled (terminal).
    Cancelled,
}

impl DisplayState {
    /// Returns true if no further display updates will follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DisplayState::Completed | DisplayState::Cancelled)
    }
}

/// Tracking state for a single active delivery.
///
/// Owned by exactly one consumer; not shared across concurrent mutators.
/// The session performs no I/O: snapshots are handed to it by the refresh
/// task and ticks by the tick task.
pub struct TrackingSession {
    last_snapshot: Option<TrackingSnapshot>,
    remaining_secs: Option<i64>,
    distance_km: Option<f64>,
    eta_seconds: Option<u64>,
    display: DisplayState,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingSession {
    pub fn new() -> Self {
        Self {
            last_snapshot: None,
            remaining_secs: None,
            distance_km: None,
            eta_seconds: None,
            display: DisplayState::Waiting {
                delivery_status: None,
            },
        }
    }

    /// The current display value.
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// The last accepted snapshot, if any.
    pub fn last_snapshot(&self) -> Option<&TrackingSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Ingest an authoritative snapshot and recompute the display.
    ///
    /// Snapshots captured earlier than the last accepted one are discarded so
    /// racing refreshes resolve last-write-wins on capture time, not arrival
    /// order. A terminal display state is sticky: once completed or
    /// cancelled, later snapshots change nothing.
    pub fn on_snapshot(&mut self, snapshot: TrackingSnapshot) -> DisplayState {
        if self.display.is_terminal() {
            return self.display.clone();
        }

        if let Some(ref last) = self.last_snapshot {
            if snapshot.captured_at < last.captured_at {
                tracing::debug!(
                    order_id = %snapshot.order_id,
                    "discarding stale snapshot"
                );
                return self.display.clone();
            }
        }

        self.display = self.compute_display(&snapshot);
        if self.display.is_terminal() {
            self.remaining_secs = None;
        }
        self.last_snapshot = Some(snapshot);
        self.display.clone()
    }

    /// Advance the local countdown by one second, floored at zero.
    ///
    /// Runs on a fixed one-second cadence regardless of whether a snapshot
    /// has arrived in between. Never blocks and performs no I/O.
    pub fn tick(&mut self) -> DisplayState {
        if self.display.is_terminal() {
            return self.display.clone();
        }

        if let Some(remaining) = self.remaining_secs {
            let remaining = (remaining - 1).max(0);
            self.remaining_secs = Some(remaining);
            if let (Some(distance_km), Some(eta_seconds)) = (self.distance_km, self.eta_seconds) {
                self.display = DisplayState::Tracking {
                    distance_km,
                    eta_seconds,
                    countdown: geo::format_countdown(remaining),
                };
            }
        }

        self.display.clone()
    }

    fn compute_display(&mut self, snapshot: &TrackingSnapshot) -> DisplayState {
        if snapshot.order_status == OrderStatus::Cancelled {
            return DisplayState::Cancelled;
        }

        match snapshot.delivery_status {
            Some(DeliveryStatus::Delivered) => DisplayState::Completed,
            Some(DeliveryStatus::OnRoute) => {
                match (snapshot.courier_position, snapshot.consumer_position) {
                    (Some(courier), Some(consumer)) => {
                        let distance_km =
                            geo::distance_km(courier.lat, courier.lon, consumer.lat, consumer.lon);
                        let eta_seconds = geo::estimated_seconds(distance_km);

                        // Fresh baseline: the server-derived estimate replaces
                        // whatever the local countdown had drifted to.
                        self.distance_km = Some(distance_km);
                        self.eta_seconds = Some(eta_seconds);
                        self.remaining_secs = Some(eta_seconds as i64);

                        DisplayState::Tracking {
                            distance_km,
                            eta_seconds,
                            countdown: geo::format_countdown(eta_seconds as i64),
                        }
                    }
                    // On route but a position is missing: nothing to estimate.
                    _ => DisplayState::Waiting {
                        delivery_status: Some(DeliveryStatus::OnRoute),
                    },
                }
            }
            other => DisplayState::Waiting {
                delivery_status: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Position;
    use chrono::{DateTime, Duration, Utc};

    fn on_route_snapshot(captured_at: DateTime<Utc>) -> TrackingSnapshot {
        TrackingSnapshot {
            order_id: "order-1".to_string(),
            order_status: OrderStatus::Delivering,
            delivery_status: Some(DeliveryStatus::OnRoute),
            courier_position: Some(Position::new(45.4642, 9.19)),
            consumer_position: Some(Position::new(45.4762, 9.19)),
            captured_at,
        }
    }

    fn snapshot_with_delivery_status(status: Option<DeliveryStatus>) -> TrackingSnapshot {
        TrackingSnapshot {
            order_id: "order-1".to_string(),
            order_status: OrderStatus::Preparing,
            delivery_status: status,
            courier_position: None,
            consumer_position: None,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_session_starts_waiting() {
        let session = TrackingSession::new();
        assert_eq!(
            session.display(),
            &DisplayState::Waiting {
                delivery_status: None
            }
        );
    }

    #[test]
    fn test_on_route_snapshot_starts_tracking() {
        let mut session = TrackingSession::new();
        let state = session.on_snapshot(on_route_snapshot(Utc::now()));

        let DisplayState::Tracking {
            distance_km,
            eta_seconds,
            countdown,
        } = state
        else {
            panic!("expected Tracking, got {:?}", session.display());
        };
        // ~1.33 km apart -> short-range buffer applies.
        assert!((distance_km - 1.33).abs() < 0.05, "got {}", distance_km);
        assert_eq!(eta_seconds, 480);
        assert_eq!(countdown, "8 minutes");
    }

    #[test]
    fn test_tick_decrements_smoothly() {
        let mut session = TrackingSession::new();
        session.on_snapshot(on_route_snapshot(Utc::now()));

        for _ in 0..5 {
            session.tick();
        }

        let DisplayState::Tracking {
            eta_seconds,
            countdown,
            ..
        } = session.display().clone()
        else {
            panic!("expected Tracking");
        };
        // Baseline unchanged, countdown ticked down by 5s.
        assert_eq!(eta_seconds, 480);
        assert_eq!(countdown, geo::format_countdown(475));
    }

    #[test]
    fn test_tick_floors_at_zero() {
        let mut session = TrackingSession::new();
        session.on_snapshot(on_route_snapshot(Utc::now()));

        for _ in 0..500 {
            session.tick();
        }

        let DisplayState::Tracking { countdown, .. } = session.display().clone() else {
            panic!("expected Tracking");
        };
        assert_eq!(countdown, "arriving now");

        // Further ticks stay at zero.
        let state = session.tick();
        assert!(matches!(state, DisplayState::Tracking { ref countdown, .. } if countdown == "arriving now"));
    }

    #[test]
    fn test_fresh_snapshot_resets_local_countdown() {
        let mut session = TrackingSession::new();
        let t0 = Utc::now();
        session.on_snapshot(on_route_snapshot(t0));

        for _ in 0..8 {
            session.tick();
        }

        // The next refresh discards the locally ticked value.
        session.on_snapshot(on_route_snapshot(t0 + Duration::seconds(8)));
        session.tick();

        let DisplayState::Tracking { countdown, .. } = session.display().clone() else {
            panic!("expected Tracking");
        };
        assert_eq!(countdown, geo::format_countdown(479));
    }

    #[test]
    fn test_stale_snapshot_discarded() {
        let mut session = TrackingSession::new();
        let t0 = Utc::now();
        session.on_snapshot(on_route_snapshot(t0));
        session.tick();

        // A slow response from before the accepted snapshot arrives late.
        let mut stale = snapshot_with_delivery_status(Some(DeliveryStatus::Assigned));
        stale.captured_at = t0 - Duration::seconds(10);
        let state = session.on_snapshot(stale);

        assert!(matches!(state, DisplayState::Tracking { .. }));
        assert_eq!(
            session.last_snapshot().unwrap().captured_at,
            t0,
            "stale snapshot must not replace the accepted one"
        );
    }

    #[test]
    fn test_delivered_snapshot_mid_tick_halts_countdown() {
        let mut session = TrackingSession::new();
        let t0 = Utc::now();
        session.on_snapshot(on_route_snapshot(t0));
        session.tick();
        session.tick();

        let mut done = on_route_snapshot(t0 + Duration::seconds(8));
        done.delivery_status = Some(DeliveryStatus::Delivered);
        let state = session.on_snapshot(done);

        assert_eq!(state, DisplayState::Completed);
        // Ticking has stopped: the terminal state is sticky.
        assert_eq!(session.tick(), DisplayState::Completed);
        assert_eq!(session.tick(), DisplayState::Completed);
    }

    #[test]
    fn test_terminal_state_ignores_later_snapshots() {
        let mut session = TrackingSession::new();
        let t0 = Utc::now();
        let mut done = on_route_snapshot(t0);
        done.delivery_status = Some(DeliveryStatus::Delivered);
        session.on_snapshot(done);

        let state = session.on_snapshot(on_route_snapshot(t0 + Duration::seconds(8)));
        assert_eq!(state, DisplayState::Completed);
    }

    #[test]
    fn test_cancelled_order_is_terminal() {
        let mut session = TrackingSession::new();
        let mut snapshot = on_route_snapshot(Utc::now());
        snapshot.order_status = OrderStatus::Cancelled;

        assert_eq!(session.on_snapshot(snapshot), DisplayState::Cancelled);
        assert_eq!(session.tick(), DisplayState::Cancelled);
    }

    #[test]
    fn test_non_tracking_statuses_report_waiting() {
        for status in [
            None,
            Some(DeliveryStatus::Pending),
            Some(DeliveryStatus::Assigned),
        ] {
            let mut session = TrackingSession::new();
            let state = session.on_snapshot(snapshot_with_delivery_status(status));
            assert_eq!(
                state,
                DisplayState::Waiting {
                    delivery_status: status
                }
            );
        }
    }

    #[test]
    fn test_on_route_without_positions_is_waiting() {
        let mut session = TrackingSession::new();
        let mut snapshot = on_route_snapshot(Utc::now());
        snapshot.consumer_position = None;

        let state = session.on_snapshot(snapshot);
        assert_eq!(
            state,
            DisplayState::Waiting {
                delivery_status: Some(DeliveryStatus::OnRoute)
            }
        );
        // No baseline was set, so ticking changes nothing.
        assert_eq!(
            session.tick(),
            DisplayState::Waiting {
                delivery_status: Some(DeliveryStatus::OnRoute)
            }
        );
    }
}
