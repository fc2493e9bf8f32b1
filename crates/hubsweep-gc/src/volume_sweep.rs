//! Volume lifecycle sweep.
//!
//! Deletes detached user volumes whose `volume-delete-time` has passed, as
//! long as a recent completed snapshot of the same owner exists.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::Instrument;

use hubsweep_core::observability::sweep_span;
use hubsweep_core::{
    CloudVolume, EmailTransport, OwnerKey, OwnerKeyPolicy, Parsed, ProtectedOwnerKeys,
    ResourceStore, SnapshotFilter, SweepConfig, VolumeFilter, VolumeState, VolumeTimeline,
};

use crate::error::{Result, SweepError};
use crate::notify::Notifier;
use crate::report::{Skip, SweepKind, SweepRun, RUN_LEVEL_RESOURCE_ID};

/// Deletes expired detached volumes.
pub struct VolumeSweep {
    store: Arc<dyn ResourceStore>,
    notifier: Notifier,
    policy: ProtectedOwnerKeys,
    config: SweepConfig,
}

impl VolumeSweep {
    /// Creates a sweep over `store`, reporting errors through `transport`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        transport: Arc<dyn EmailTransport>,
        config: SweepConfig,
    ) -> Self {
        Self {
            store,
            notifier: Notifier::new(transport, &config),
            policy: config.owner_key_policy(),
            config,
        }
    }

    /// Runs the sweep against the current time.
    pub async fn run(&self) -> SweepRun {
        self.run_at(Utc::now()).await
    }

    /// Runs the sweep as if it were `now`.
    ///
    /// Never fails: every problem is recorded in the returned run.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SweepRun {
        let span = sweep_span(
            SweepKind::Volume.as_str(),
            &self.config.cluster_name,
            self.config.dry_run,
        );
        self.run_inner(now).instrument(span).await
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> SweepRun {
        let started = Instant::now();
        let mut run = SweepRun::new(SweepKind::Volume, self.config.dry_run);
        tracing::info!(
            %now,
            ignore_snapshot_requirement = self.config.ignore_snapshot_requirement,
            metric = "hubsweep_sweep_started",
            "starting volume sweep"
        );

        match self
            .store
            .list_volumes(&VolumeFilter::available(&self.config.cluster_name))
            .await
        {
            Ok(volumes) => {
                tracing::info!(count = volumes.len(), "listed available volumes");
                for volume in &volumes {
                    run.examined += 1;
                    if let Err(e) = self.process(volume, now, &mut run).await {
                        run.record_error(&volume.id, &e);
                    }
                }
            }
            Err(e) => run.record_error(RUN_LEVEL_RESOURCE_ID, &SweepError::RunFailure(e)),
        }

        if run.has_errors() {
            if let Err(e) = self
                .notifier
                .send_admin_report(SweepKind::Volume, &run.errors)
                .await
            {
                tracing::error!(error = %e, "failed to send admin report");
            }
        }

        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        crate::metrics::record_run(SweepKind::Volume.as_str(), duration.as_secs_f64());
        tracing::info!(
            examined = run.examined,
            deleted = run.deleted,
            skipped = run.skipped,
            errors = run.errors.len(),
            duration_ms,
            metric = "hubsweep_sweep_completed",
            "volume sweep completed"
        );
        run
    }

    async fn process(
        &self,
        volume: &CloudVolume,
        now: DateTime<Utc>,
        run: &mut SweepRun,
    ) -> Result<()> {
        let Some(owner) = volume.owner_key() else {
            run.record_skip(&volume.id, &Skip::MissingOwnerKey);
            return Ok(());
        };
        if volume.is_protected() {
            run.record_skip(&volume.id, &Skip::DoNotDelete);
            return Ok(());
        }
        if self.policy.is_protected(&owner) {
            run.record_skip(&volume.id, &Skip::ProtectedOwner);
            return Ok(());
        }
        let timeline = match VolumeTimeline::from_tags(&volume.tags)? {
            Parsed::Ready(timeline) => timeline,
            Parsed::Skip(reason) => {
                run.record_skip(&volume.id, &Skip::Timeline(reason));
                return Ok(());
            }
        };

        let today = now.date_naive();
        if today <= timeline.volume_delete_date() {
            tracing::debug!(
                volume_id = %volume.id,
                volume_delete = %timeline.volume_delete_date(),
                "volume not yet due for deletion"
            );
            return Ok(());
        }
        if volume.state != VolumeState::Available {
            run.record_skip(&volume.id, &Skip::NotAvailable);
            return Ok(());
        }
        if !self.config.ignore_snapshot_requirement && !self.has_fresh_snapshot(owner, now).await? {
            run.record_skip(&volume.id, &Skip::NoFreshSnapshot);
            return Ok(());
        }

        if self.config.dry_run {
            tracing::info!(volume_id = %volume.id, "dry run: volume not deleted");
        } else {
            self.store.delete_volume(&volume.id).await?;
            tracing::info!(volume_id = %volume.id, "deleted volume");
            crate::metrics::record_deletion(SweepKind::Volume.as_str(), "expired");
        }
        run.deleted += 1;
        Ok(())
    }

    /// True if a completed snapshot of `owner` started within the staleness
    /// window ending at `now`.
    async fn has_fresh_snapshot(&self, owner: OwnerKey, now: DateTime<Utc>) -> Result<bool> {
        let days = self.config.snapshot_staleness_days;
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or(SweepError::StalenessOutOfRange { days })?;
        let snapshots = self
            .store
            .list_snapshots(&SnapshotFilter::completed(&self.config.cluster_name).for_owner(owner))
            .await?;
        Ok(snapshots
            .iter()
            .any(|s| s.start_time.is_some_and(|started| started >= cutoff)))
    }
}

impl std::fmt::Debug for VolumeSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeSweep")
            .field("cluster_name", &self.config.cluster_name)
            .field("dry_run", &self.config.dry_run)
            .finish_non_exhaustive()
    }
}
