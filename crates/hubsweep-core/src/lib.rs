//! # hubsweep-core
//!
//! Shared primitives for the storage lifecycle sweeps of a multi-tenant
//! notebook platform.
//!
//! Each user's home directory lives on a cloud block volume that is backed
//! up by periodic snapshots. When a user's server stops, a hook tags the
//! volume with a deletion timeline; snapshots inherit those tags. This crate
//! turns that tag state into typed values:
//!
//! - **Tags**: flat lookup over a resource's key/value tags ([`tags`])
//! - **Owner keys**: the claim name linking volumes, snapshots and users ([`owner`])
//! - **Timelines**: the validated `stop <= volume delete <= snapshot delete` triple ([`timeline`])
//! - **Phases**: the pure day-granularity action decision ([`phase`])
//! - **Collaborators**: [`store::ResourceStore`] and [`email::EmailTransport`]
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use hubsweep_core::prelude::*;
//!
//! let tags = TagSet::new()
//!     .with("server-stop-time", "2024-01-01 09:00:00+00:00")
//!     .with("volume-delete-time", "2024-01-05 09:00:00+00:00")
//!     .with("snapshot-delete-time", "2024-02-15 09:00:00+00:00");
//!
//! let Ok(Parsed::Ready(timeline)) = LifecycleTimeline::from_tags(&tags) else {
//!     panic!("valid tags");
//! };
//! let thresholds = NotificationThresholds::new(vec![30, 40], Some(44));
//! let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
//! assert!(evaluate(today, &timeline, &thresholds).contains(&Action::DeleteResource));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod email;
pub mod error;
pub mod observability;
pub mod owner;
pub mod phase;
pub mod resource;
pub mod store;
pub mod tags;
pub mod timeline;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::SweepConfig;
    pub use crate::email::{EmailMessage, EmailTransport};
    pub use crate::error::{Error, Result};
    pub use crate::owner::{OwnerKey, OwnerKeyPolicy, ProtectedOwnerKeys};
    pub use crate::phase::{evaluate, Action, NotificationThresholds, Phase};
    pub use crate::resource::{CloudSnapshot, CloudVolume, SnapshotStatus, VolumeState};
    pub use crate::store::{ResourceStore, SnapshotFilter, VolumeFilter};
    pub use crate::tags::{Tag, TagSet};
    pub use crate::timeline::{LifecycleTimeline, Parsed, SkipReason, TimelineError, VolumeTimeline};
}

pub use config::SweepConfig;
pub use email::{EmailMessage, EmailTransport};
pub use error::{Error, Result};
pub use observability::{init_logging, LogFormat};
pub use owner::{OwnerKey, OwnerKeyError, OwnerKeyPolicy, ProtectedOwnerKeys};
pub use phase::{Action, NotificationThresholds, Phase};
pub use resource::{CloudSnapshot, CloudVolume, SnapshotStatus, VolumeState};
pub use store::{ResourceStore, SnapshotFilter, VolumeFilter};
pub use tags::{Tag, TagSet};
pub use timeline::{LifecycleTimeline, Parsed, SkipReason, TimelineError, VolumeTimeline};
