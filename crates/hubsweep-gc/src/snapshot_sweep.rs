//! Snapshot lifecycle sweep.
//!
//! One pass over the cluster's completed snapshots:
//!
//! 1. list snapshots (a failure ends the run with a single `N/A` error)
//! 2. delete older duplicates per owner
//! 3. evaluate each survivor's timeline and execute today's actions
//! 4. send one admin report if anything was recorded

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::Instrument;

use hubsweep_core::observability::sweep_span;
use hubsweep_core::phase::evaluate;
use hubsweep_core::{
    Action, CloudSnapshot, EmailTransport, LifecycleTimeline, Parsed, ProtectedOwnerKeys,
    ResourceStore, SnapshotFilter, SweepConfig, VolumeFilter,
};

use crate::dedup::Deduplicator;
use crate::error::{Result, SweepError};
use crate::notify::Notifier;
use crate::report::{Skip, SweepKind, SweepRun, RUN_LEVEL_RESOURCE_ID};

/// Deletes duplicate and expired snapshots and emails their owners.
pub struct SnapshotSweep {
    store: Arc<dyn ResourceStore>,
    notifier: Notifier,
    policy: ProtectedOwnerKeys,
    config: SweepConfig,
}

impl SnapshotSweep {
    /// Creates a sweep over `store`, sending email through `transport`.
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
            SweepKind::Snapshot.as_str(),
            &self.config.cluster_name,
            self.config.dry_run,
        );
        self.run_inner(now.date_naive()).instrument(span).await
    }

    async fn run_inner(&self, today: NaiveDate) -> SweepRun {
        let started = Instant::now();
        let mut run = SweepRun::new(SweepKind::Snapshot, self.config.dry_run);
        tracing::info!(%today, metric = "hubsweep_sweep_started", "starting snapshot sweep");

        match self
            .store
            .list_snapshots(&SnapshotFilter::completed(&self.config.cluster_name))
            .await
        {
            Ok(snapshots) => {
                tracing::info!(count = snapshots.len(), "listed completed snapshots");
                self.sweep_snapshots(snapshots, today, &mut run).await;
            }
            Err(e) => run.record_error(RUN_LEVEL_RESOURCE_ID, &SweepError::RunFailure(e)),
        }

        if run.has_errors() {
            if let Err(e) = self
                .notifier
                .send_admin_report(SweepKind::Snapshot, &run.errors)
                .await
            {
                tracing::error!(error = %e, "failed to send admin report");
            }
        }

        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        crate::metrics::record_run(SweepKind::Snapshot.as_str(), duration.as_secs_f64());
        tracing::info!(
            examined = run.examined,
            deleted = run.deleted,
            duplicates_deleted = run.duplicates_deleted,
            warning_emails = run.warning_emails,
            deletion_emails = run.deletion_emails,
            skipped = run.skipped,
            errors = run.errors.len(),
            duration_ms,
            metric = "hubsweep_sweep_completed",
            "snapshot sweep completed"
        );
        run
    }

    async fn sweep_snapshots(
        &self,
        snapshots: Vec<CloudSnapshot>,
        today: NaiveDate,
        run: &mut SweepRun,
    ) {
        let reduced = Deduplicator::new(&self.policy).reduce(snapshots);

        for (snapshot, skip) in &reduced.excluded {
            run.record_skip(&snapshot.id, skip);
        }

        for duplicate in &reduced.duplicates {
            match self.delete(&duplicate.id, "duplicate").await {
                Ok(()) => run.duplicates_deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        snapshot_id = %duplicate.id,
                        error = %e,
                        "failed to delete duplicate snapshot"
                    );
                }
            }
        }

        for snapshot in &reduced.survivors {
            run.examined += 1;
            if let Err(e) = self.process(snapshot, today, run).await {
                run.record_error(&snapshot.id, &e);
            }
        }
    }

    async fn process(
        &self,
        snapshot: &CloudSnapshot,
        today: NaiveDate,
        run: &mut SweepRun,
    ) -> Result<()> {
        let Some(owner) = snapshot.owner_key() else {
            run.record_skip(&snapshot.id, &Skip::MissingOwnerKey);
            return Ok(());
        };
        let username = match owner.username() {
            Ok(username) => username,
            Err(e) => {
                run.record_skip(&snapshot.id, &Skip::UnresolvableOwner(e));
                return Ok(());
            }
        };
        let timeline = match LifecycleTimeline::from_tags(&snapshot.tags)? {
            Parsed::Ready(timeline) => timeline,
            Parsed::Skip(reason) => {
                run.record_skip(&snapshot.id, &Skip::Timeline(reason));
                return Ok(());
            }
        };

        let volumes = self
            .store
            .list_volumes(&VolumeFilter::for_owner(&self.config.cluster_name, owner))
            .await?;
        if !volumes.is_empty() {
            run.record_skip(&snapshot.id, &Skip::SourceVolumeExists);
            return Ok(());
        }

        let actions = evaluate(today, &timeline, &self.config.thresholds);
        tracing::debug!(
            snapshot_id = %snapshot.id,
            actions = ?actions,
            "evaluated snapshot timeline"
        );
        for action in actions {
            match action {
                Action::None => {}
                Action::SendWarningEmail => {
                    self.notifier.send_warning(&username, &timeline).await?;
                    run.warning_emails += 1;
                }
                Action::SendDeletionEmail => {
                    self.notifier.send_deletion(&username).await?;
                    run.deletion_emails += 1;
                }
                Action::DeleteResource => {
                    self.delete(&snapshot.id, "expired").await?;
                    run.deleted += 1;
                }
                Action::Overdue => {
                    return Err(SweepError::Overdue {
                        snapshot_delete: timeline.snapshot_delete_date(),
                        today,
                    });
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, snapshot_id: &str, reason: &'static str) -> hubsweep_core::Result<()> {
        if self.config.dry_run {
            tracing::info!(snapshot_id, reason, "dry run: snapshot not deleted");
            return Ok(());
        }
        self.store.delete_snapshot(snapshot_id).await?;
        tracing::info!(snapshot_id, reason, "deleted snapshot");
        crate::metrics::record_deletion(SweepKind::Snapshot.as_str(), reason);
        Ok(())
    }
}

impl std::fmt::Debug for SnapshotSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSweep")
            .field("cluster_name", &self.config.cluster_name)
            .field("dry_run", &self.config.dry_run)
            .finish_non_exhaustive()
    }
}
