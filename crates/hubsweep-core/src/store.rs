//! Resource store interface consumed by the sweeps.
//!
//! The provider's volume/snapshot API is an external collaborator. Sweeps
//! only see it through [`ResourceStore`]; each call is a single blocking
//! request from the sweep's point of view and is never retried within a run.
//!
//! # Filters
//!
//! Listing calls take a filter describing the provider-side query. Every
//! filter carries the cluster (resources tagged `kubernetes.io/cluster/<name>`
//! = `owned`) and only returns resources that have an owner-key tag.
//! [`SnapshotFilter::matches`] and [`VolumeFilter::matches`] define the exact
//! semantics so adapters and in-memory stores agree.

use async_trait::async_trait;

use crate::error::Result;
use crate::owner::OwnerKey;
use crate::resource::{CloudSnapshot, CloudVolume, SnapshotStatus, VolumeState};

/// Query for [`ResourceStore::list_snapshots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Cluster the snapshots belong to.
    pub cluster_name: String,
    /// Restrict to one owner key.
    pub owner_key: Option<OwnerKey>,
    /// Restrict to one status.
    pub status: Option<SnapshotStatus>,
}

impl SnapshotFilter {
    /// Completed snapshots of a cluster.
    #[must_use]
    pub fn completed(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            owner_key: None,
            status: Some(SnapshotStatus::Completed),
        }
    }

    /// Restricts the filter to one owner key.
    #[must_use]
    pub fn for_owner(mut self, owner_key: OwnerKey) -> Self {
        self.owner_key = Some(owner_key);
        self
    }

    /// Returns true if `snapshot` satisfies the filter.
    #[must_use]
    pub fn matches(&self, snapshot: &CloudSnapshot) -> bool {
        let Some(owner) = snapshot.owner_key() else {
            return false;
        };
        snapshot.tags.is_owned_by_cluster(&self.cluster_name)
            && self.owner_key.as_ref().map_or(true, |k| *k == owner)
            && self.status.map_or(true, |s| s == snapshot.status)
    }
}

/// Query for [`ResourceStore::list_volumes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFilter {
    /// Cluster the volumes belong to.
    pub cluster_name: String,
    /// Restrict to one owner key.
    pub owner_key: Option<OwnerKey>,
    /// Restrict to one attachment state.
    pub state: Option<VolumeState>,
}

impl VolumeFilter {
    /// Detached volumes of a cluster.
    #[must_use]
    pub fn available(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            owner_key: None,
            state: Some(VolumeState::Available),
        }
    }

    /// Volumes of one owner, in any state.
    #[must_use]
    pub fn for_owner(cluster_name: impl Into<String>, owner_key: OwnerKey) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            owner_key: Some(owner_key),
            state: None,
        }
    }

    /// Returns true if `volume` satisfies the filter.
    #[must_use]
    pub fn matches(&self, volume: &CloudVolume) -> bool {
        let Some(owner) = volume.owner_key() else {
            return false;
        };
        volume.tags.is_owned_by_cluster(&self.cluster_name)
            && self.owner_key.as_ref().map_or(true, |k| *k == owner)
            && self.state.map_or(true, |s| s == volume.state)
    }
}

/// Cloud volume and snapshot API.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Lists snapshots matching `filter`, in provider order.
    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<CloudSnapshot>>;

    /// Lists volumes matching `filter`, in provider order.
    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<CloudVolume>>;

    /// Deletes a snapshot.
    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()>;

    /// Deletes a volume.
    async fn delete_volume(&self, volume_id: &str) -> Result<()>;
}
