//! In-memory resource store with operation tracing.
//!
//! Listing returns resources in insertion order, standing in for provider
//! order. Every call is recorded for later assertion.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubsweep_core::error::{Error, Result};
use hubsweep_core::{
    CloudSnapshot, CloudVolume, ResourceStore, SnapshotFilter, VolumeFilter,
};

/// Record of a store call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Snapshot listing.
    ListSnapshots {
        /// Filter that was used.
        filter: SnapshotFilter,
    },
    /// Volume listing.
    ListVolumes {
        /// Filter that was used.
        filter: VolumeFilter,
    },
    /// Snapshot deletion.
    DeleteSnapshot {
        /// Snapshot that was deleted.
        id: String,
    },
    /// Volume deletion.
    DeleteVolume {
        /// Volume that was deleted.
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Resource(String),
    SnapshotListing,
    VolumeListing,
}

#[derive(Debug, Clone)]
struct Failure {
    target: Target,
    /// `None` fails every call; `Some(n)` fails the next `n` calls.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct Resources {
    snapshots: Vec<CloudSnapshot>,
    volumes: Vec<CloudVolume>,
}

/// In-memory [`ResourceStore`] with operation tracing.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceStore {
    resources: Arc<Mutex<Resources>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl MemoryResourceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a snapshot.
    pub fn insert_snapshot(&self, snapshot: CloudSnapshot) {
        self.resources.lock().expect("lock").snapshots.push(snapshot);
    }

    /// Adds a volume.
    pub fn insert_volume(&self, volume: CloudVolume) {
        self.resources.lock().expect("lock").volumes.push(volume);
    }

    /// Ids of the snapshots still present.
    pub fn snapshot_ids(&self) -> Vec<String> {
        let resources = self.resources.lock().expect("lock");
        resources.snapshots.iter().map(|s| s.id.clone()).collect()
    }

    /// Ids of the volumes still present.
    pub fn volume_ids(&self) -> Vec<String> {
        let resources = self.resources.lock().expect("lock");
        resources.volumes.iter().map(|v| v.id.clone()).collect()
    }

    /// Returns all recorded operations.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Ids of snapshots deleted so far, in call order.
    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::DeleteSnapshot { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Ids of volumes deleted so far, in call order.
    pub fn deleted_volumes(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::DeleteVolume { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Makes every deletion of `id` fail.
    pub fn inject_failure(&self, id: impl Into<String>) {
        self.push_failure(Target::Resource(id.into()), None);
    }

    /// Makes the next deletion of `id` fail.
    pub fn inject_failure_once(&self, id: impl Into<String>) {
        self.push_failure(Target::Resource(id.into()), Some(1));
    }

    /// Makes every snapshot listing fail.
    pub fn fail_snapshot_listing(&self) {
        self.push_failure(Target::SnapshotListing, None);
    }

    /// Makes every volume listing fail.
    pub fn fail_volume_listing(&self) {
        self.push_failure(Target::VolumeListing, None);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock").clear();
    }

    fn push_failure(&self, target: Target, remaining: Option<u32>) {
        self.failures
            .lock()
            .expect("lock")
            .push(Failure { target, remaining });
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, target: &Target) -> Result<()> {
        let mut failures = self.failures.lock().expect("lock");
        let Some(index) = failures.iter().position(|f| f.target == *target) else {
            return Ok(());
        };
        let exhausted = match failures[index].remaining.as_mut() {
            Some(remaining) => {
                *remaining -= 1;
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            failures.remove(index);
        }
        Err(Error::store(format!("injected failure for {target:?}")))
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<CloudSnapshot>> {
        self.record(StoreOp::ListSnapshots {
            filter: filter.clone(),
        });
        self.check_failure(&Target::SnapshotListing)?;
        let resources = self.resources.lock().expect("lock");
        Ok(resources
            .snapshots
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<CloudVolume>> {
        self.record(StoreOp::ListVolumes {
            filter: filter.clone(),
        });
        self.check_failure(&Target::VolumeListing)?;
        let resources = self.resources.lock().expect("lock");
        Ok(resources
            .volumes
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.check_failure(&Target::Resource(snapshot_id.to_string()))?;
        let mut resources = self.resources.lock().expect("lock");
        let index = resources
            .snapshots
            .iter()
            .position(|s| s.id == snapshot_id)
            .ok_or_else(|| Error::not_found("snapshot", snapshot_id))?;
        resources.snapshots.remove(index);
        drop(resources);
        self.record(StoreOp::DeleteSnapshot {
            id: snapshot_id.to_string(),
        });
        Ok(())
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<()> {
        self.check_failure(&Target::Resource(volume_id.to_string()))?;
        let mut resources = self.resources.lock().expect("lock");
        let index = resources
            .volumes
            .iter()
            .position(|v| v.id == volume_id)
            .ok_or_else(|| Error::not_found("volume", volume_id))?;
        resources.volumes.remove(index);
        drop(resources);
        self.record(StoreOp::DeleteVolume {
            id: volume_id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SnapshotBuilder, VolumeBuilder, TEST_CLUSTER};

    #[tokio::test]
    async fn delete_removes_and_records() {
        let store = MemoryResourceStore::new();
        store.insert_snapshot(SnapshotBuilder::new("snap-1", "claim-alice").build());

        store.delete_snapshot("snap-1").await.unwrap();

        assert!(store.snapshot_ids().is_empty());
        assert_eq!(store.deleted_snapshots(), ["snap-1"]);
        assert!(store.delete_snapshot("snap-1").await.is_err());
    }

    #[tokio::test]
    async fn single_shot_failure_clears() {
        let store = MemoryResourceStore::new();
        store.insert_volume(VolumeBuilder::new("vol-1", "claim-alice").build());
        store.inject_failure_once("vol-1");

        assert!(store.delete_volume("vol-1").await.is_err());
        assert!(store.delete_volume("vol-1").await.is_ok());
    }

    #[tokio::test]
    async fn cleared_failures_and_operations_start_fresh() {
        let store = MemoryResourceStore::new();
        store.insert_volume(VolumeBuilder::new("vol-1", "claim-alice").build());
        store.inject_failure("vol-1");
        store.fail_volume_listing();
        let filter = VolumeFilter::available(TEST_CLUSTER);

        assert!(store.delete_volume("vol-1").await.is_err());
        assert!(store.list_volumes(&filter).await.is_err());
        assert!(!store.operations().is_empty());

        store.clear_failures();
        store.clear_operations();
        assert!(store.operations().is_empty());
        assert_eq!(store.list_volumes(&filter).await.unwrap().len(), 1);
        store.delete_volume("vol-1").await.unwrap();
        assert_eq!(store.deleted_volumes(), ["vol-1"]);
    }

    #[tokio::test]
    async fn listing_failure_is_persistent() {
        let store = MemoryResourceStore::new();
        store.fail_snapshot_listing();
        let filter = SnapshotFilter::completed(TEST_CLUSTER);

        assert!(store.list_snapshots(&filter).await.is_err());
        assert!(store.list_snapshots(&filter).await.is_err());
        assert_eq!(store.operations().len(), 2);
    }
}
