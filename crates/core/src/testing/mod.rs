//! Test doubles for integration and E2E testing.

mod mock_source;

pub use mock_source::{fixtures, MockSnapshotSource};
