//! Live delivery tracking: session state, snapshot sources, background runner.

mod runner;
mod session;
mod source;

pub use runner::TrackingRunner;
pub use session::{DisplayState, TrackingSession};
pub use source::{
    FixedPositionProvider, HttpSnapshotSource, PositionProvider, SnapshotSource, TrackingError,
};
