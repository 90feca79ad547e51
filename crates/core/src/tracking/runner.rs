//! Background runner driving a tracking session.
//!
//! Two independently scheduled periodic tasks feed one session:
//! 1. a snapshot refresh task that polls the [`SnapshotSource`] on a fixed
//!    interval (8 s by default) and may suspend on I/O;
//! 2. a one-second local tick task that never performs I/O.
//!
//! Both are cancellable and stop together when the tracked delivery reaches
//! a terminal state or when [`TrackingRunner::stop`] is called; leaking
//! either timer after teardown is a defect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;

use super::session::{DisplayState, TrackingSession};
use super::source::SnapshotSource;

/// Drives one [`TrackingSession`] with a refresh loop and a tick loop.
pub struct TrackingRunner {
    source: Arc<dyn SnapshotSource>,
    session: Arc<Mutex<TrackingSession>>,
    config: TrackingConfig,

    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    display_tx: watch::Sender<DisplayState>,
}

impl TrackingRunner {
    /// Create a new runner for one active delivery.
    pub fn new(source: Arc<dyn SnapshotSource>, config: TrackingConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (display_tx, _) = watch::channel(DisplayState::Waiting {
            delivery_status: None,
        });

        Self {
            source,
            session: Arc::new(Mutex::new(TrackingSession::new())),
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            display_tx,
        }
    }

    /// Subscribe to display updates. The receiver always holds the most
    /// recent value, so late subscribers see the current state immediately.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display_tx.subscribe()
    }

    /// Returns true while the two timer tasks are alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the refresh and tick tasks.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("tracking runner already running");
            return;
        }

        info!(
            refresh_secs = self.config.refresh_interval_secs,
            "starting tracking runner"
        );

        self.spawn_refresh_loop();
        self.spawn_tick_loop();
    }

    /// Stop both tasks, e.g. when the consumer navigates away.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping tracking runner");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_refresh_loop(&self) {
        let source = Arc::clone(&self.source);
        let session = Arc::clone(&self.session);
        let running = Arc::clone(&self.running);
        let display_tx = self.display_tx.clone();
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_secs(self.config.refresh_interval_secs);

        tokio::spawn(async move {
            debug!("snapshot refresh loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        // The fetch is awaited inline, so a slow response
                        // delays the next refresh instead of overlapping it.
                        match source.fetch().await {
                            Ok(snapshot) => {
                                let state = session.lock().await.on_snapshot(snapshot);
                                let terminal = state.is_terminal();
                                let _ = display_tx.send(state);
                                if terminal {
                                    info!("tracked delivery reached terminal state");
                                    running.store(false, Ordering::SeqCst);
                                    let _ = shutdown_tx.send(());
                                    break;
                                }
                            }
                            Err(e) => {
                                // Transient failure: keep the previous display
                                // value and retry on the next interval.
                                warn!("snapshot refresh failed: {}", e);
                            }
                        }
                    }
                }
            }
            debug!("snapshot refresh loop stopped");
        });
    }

    fn spawn_tick_loop(&self) {
        let session = Arc::clone(&self.session);
        let running = Arc::clone(&self.running);
        let display_tx = self.display_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_secs(self.config.tick_interval_secs);

        tokio::spawn(async move {
            debug!("tick loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let state = session.lock().await.tick();
                        let _ = display_tx.send(state);
                    }
                }
            }
            debug!("tick loop stopped");
        });
    }
}

impl Drop for TrackingRunner {
    fn drop(&mut self) {
        // Dropping the runner must not leak the timers.
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}
