//! # hubsweep-gc
//!
//! Daily garbage collection of user storage for one cluster.
//!
//! - **Snapshot sweep**: deletes older duplicate snapshots, walks each
//!   survivor through its lifecycle timeline, emails the owner on warning
//!   and deletion days and deletes the snapshot on its deletion day
//!   ([`SnapshotSweep`])
//! - **Volume sweep**: deletes detached volumes past their deletion day
//!   once a recent snapshot backs them up ([`VolumeSweep`])
//!
//! Both sweeps process resources one at a time. A failure on one resource
//! is recorded in the [`SweepRun`] and never stops the rest of the run; at
//! the end the recorded errors are mailed to the admin in one report.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hubsweep_core::SweepConfig;
//! use hubsweep_gc::{SnapshotSweep, VolumeSweep};
//!
//! let config = SweepConfig::from_env()?;
//! let snapshots = SnapshotSweep::new(store.clone(), transport.clone(), config.clone());
//! let run = snapshots.run().await;
//! println!("{} errors", run.errors.len());
//! VolumeSweep::new(store, transport, config).run().await;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod dedup;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod report;
pub mod snapshot_sweep;
pub mod volume_sweep;

pub use dedup::{Deduplicated, Deduplicator};
pub use error::SweepError;
pub use notify::Notifier;
pub use report::{ReportRow, Skip, SweepKind, SweepRun, RUN_LEVEL_RESOURCE_ID};
pub use snapshot_sweep::SnapshotSweep;
pub use volume_sweep::VolumeSweep;
