//! Cloud volumes and snapshots as seen by the sweeps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::owner::OwnerKey;
use crate::tags::{TagSet, OWNER_KEY_TAG};

/// Attachment state of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    /// Detached; eligible for lifecycle handling.
    Available,
    /// Attached to a running server.
    InUse,
    /// Any other provider state (creating, deleting, error).
    Other,
}

impl VolumeState {
    /// Provider name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion status of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// Still being written.
    Pending,
    /// Fully written and usable as a backup.
    Completed,
    /// Failed.
    Error,
}

/// A detachable block-storage volume backing a user's home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudVolume {
    /// Provider resource id.
    pub id: String,
    /// Attachment state.
    pub state: VolumeState,
    /// Tags in provider order.
    #[serde(default)]
    pub tags: TagSet,
}

impl CloudVolume {
    /// Owner key from the created-for tag, if present.
    #[must_use]
    pub fn owner_key(&self) -> Option<OwnerKey> {
        self.tags.get(OWNER_KEY_TAG).map(OwnerKey::new)
    }

    /// True if tagged `do-not-delete`.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.tags.is_protected()
    }
}

/// A point-in-time backup of a [`CloudVolume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSnapshot {
    /// Provider resource id.
    pub id: String,
    /// Creation (start) time. Missing on malformed provider records.
    pub start_time: Option<DateTime<Utc>>,
    /// Completion status.
    pub status: SnapshotStatus,
    /// Tags in provider order, copied from the source volume.
    #[serde(default)]
    pub tags: TagSet,
}

impl CloudSnapshot {
    /// Owner key from the created-for tag, if present.
    #[must_use]
    pub fn owner_key(&self) -> Option<OwnerKey> {
        self.tags.get(OWNER_KEY_TAG).map(OwnerKey::new)
    }

    /// True if tagged `do-not-delete`.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.tags.is_protected()
    }
}
