//! Shared test utilities for hubsweep tests.
//!
//! This crate provides:
//! - [`MemoryResourceStore`]: in-memory resource store with operation recording
//!   and failure injection
//! - [`RecordingTransport`]: email transport that keeps every message
//! - [`TestContext`] and the resource builders in [`fixtures`]
//!
//! # Example
//!
//! ```rust,ignore
//! use hubsweep_test_utils::{TestContext, SnapshotBuilder, utc};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestContext::new();
//!     ctx.store.insert_snapshot(SnapshotBuilder::new("snap-1", "claim-alice").build());
//!     // ... run a sweep ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod email;
pub mod fixtures;
pub mod storage;

pub use email::*;
pub use fixtures::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hubsweep=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
