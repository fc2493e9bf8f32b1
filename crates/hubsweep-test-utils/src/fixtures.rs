//! Pre-built test fixtures for sweep scenarios.
//!
//! Builders start from a resource that belongs to [`TEST_CLUSTER`] and is
//! owned by the given claim; lifecycle tags are written in the stop hook's
//! wire format.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hubsweep_core::tags::{
    cluster_tag, CLUSTER_OWNED_VALUE, DO_NOT_DELETE_TAG, LEGACY_STOPPING_TIME_TAG, OWNER_KEY_TAG,
    SERVER_STOP_TIME_TAG, SNAPSHOT_DELETE_TIME_TAG, VOLUME_DELETE_TIME_TAG,
};
use hubsweep_core::timeline::format_tag_time;
use hubsweep_core::{
    CloudSnapshot, CloudVolume, NotificationThresholds, SnapshotStatus, SweepConfig, TagSet,
    VolumeState,
};

use crate::email::RecordingTransport;
use crate::storage::MemoryResourceStore;

/// Cluster used by all fixtures.
pub const TEST_CLUSTER: &str = "osl-test";

/// UTC instant at noon on the given day.
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}

/// Configuration for [`TEST_CLUSTER`] with warnings at 30 and 40 days and
/// the deletion email at 44 days.
pub fn test_config() -> SweepConfig {
    let mut config = SweepConfig::new(TEST_CLUSTER, "us-west-2");
    config.lab_short_name = Some("test-lab".to_string());
    config.portal_domain = "https://portal.test".to_string();
    config.thresholds = NotificationThresholds::new(vec![30, 40], Some(44));
    config
}

/// Test context with a shared store, transport and configuration.
pub struct TestContext {
    /// Resource store.
    pub store: Arc<MemoryResourceStore>,
    /// Email transport.
    pub transport: Arc<RecordingTransport>,
    /// Sweep configuration.
    pub config: SweepConfig,
}

impl TestContext {
    /// Creates an empty context using [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates an empty context with `config`.
    pub fn with_config(config: SweepConfig) -> Self {
        Self {
            store: Arc::new(MemoryResourceStore::new()),
            transport: Arc::new(RecordingTransport::new()),
            config,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn base_tags(owner_key: &str) -> TagSet {
    TagSet::new()
        .with(cluster_tag(TEST_CLUSTER), CLUSTER_OWNED_VALUE)
        .with(OWNER_KEY_TAG, owner_key)
}

/// Builder for [`CloudSnapshot`] fixtures.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: CloudSnapshot,
}

impl SnapshotBuilder {
    /// Completed snapshot started on 2024-01-01, with no lifecycle tags.
    pub fn new(id: impl Into<String>, owner_key: &str) -> Self {
        Self {
            snapshot: CloudSnapshot {
                id: id.into(),
                start_time: Some(utc(2024, 1, 1)),
                status: SnapshotStatus::Completed,
                tags: base_tags(owner_key),
            },
        }
    }

    /// Sets the start time.
    pub fn started(mut self, at: DateTime<Utc>) -> Self {
        self.snapshot.start_time = Some(at);
        self
    }

    /// Clears the start time.
    pub fn without_start_time(mut self) -> Self {
        self.snapshot.start_time = None;
        self
    }

    /// Sets the status.
    pub fn status(mut self, status: SnapshotStatus) -> Self {
        self.snapshot.status = status;
        self
    }

    /// Writes all three lifecycle tags.
    pub fn timeline(
        self,
        stop: DateTime<Utc>,
        volume_delete: DateTime<Utc>,
        snapshot_delete: DateTime<Utc>,
    ) -> Self {
        self.tag(SERVER_STOP_TIME_TAG, format_tag_time(stop))
            .tag(VOLUME_DELETE_TIME_TAG, format_tag_time(volume_delete))
            .tag(SNAPSHOT_DELETE_TIME_TAG, format_tag_time(snapshot_delete))
    }

    /// Adds the legacy stopping-time tag.
    pub fn legacy(self) -> Self {
        self.tag(LEGACY_STOPPING_TIME_TAG, "2023-06-01 00:00:00+00:00")
    }

    /// Adds `do-not-delete`.
    pub fn do_not_delete(self) -> Self {
        self.tag(DO_NOT_DELETE_TAG, "true")
    }

    /// Adds an arbitrary tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.snapshot.tags.push(key, value);
        self
    }

    /// Returns the snapshot.
    pub fn build(self) -> CloudSnapshot {
        self.snapshot
    }
}

/// Builder for [`CloudVolume`] fixtures.
#[derive(Debug, Clone)]
pub struct VolumeBuilder {
    volume: CloudVolume,
}

impl VolumeBuilder {
    /// Available volume with no lifecycle tags.
    pub fn new(id: impl Into<String>, owner_key: &str) -> Self {
        Self {
            volume: CloudVolume {
                id: id.into(),
                state: VolumeState::Available,
                tags: base_tags(owner_key),
            },
        }
    }

    /// Volume without an owner-key tag.
    pub fn unowned(id: impl Into<String>) -> Self {
        Self {
            volume: CloudVolume {
                id: id.into(),
                state: VolumeState::Available,
                tags: TagSet::new().with(cluster_tag(TEST_CLUSTER), CLUSTER_OWNED_VALUE),
            },
        }
    }

    /// Sets the attachment state.
    pub fn state(mut self, state: VolumeState) -> Self {
        self.volume.state = state;
        self
    }

    /// Writes the stop and volume-delete tags.
    pub fn timeline(self, stop: DateTime<Utc>, volume_delete: DateTime<Utc>) -> Self {
        self.tag(SERVER_STOP_TIME_TAG, format_tag_time(stop))
            .tag(VOLUME_DELETE_TIME_TAG, format_tag_time(volume_delete))
    }

    /// Adds the legacy stopping-time tag.
    pub fn legacy(self) -> Self {
        self.tag(LEGACY_STOPPING_TIME_TAG, "2023-06-01 00:00:00+00:00")
    }

    /// Adds `do-not-delete`.
    pub fn do_not_delete(self) -> Self {
        self.tag(DO_NOT_DELETE_TAG, "true")
    }

    /// Adds an arbitrary tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.volume.tags.push(key, value);
        self
    }

    /// Returns the volume.
    pub fn build(self) -> CloudVolume {
        self.volume
    }
}
