//! Volume sweep end-to-end tests against the in-memory store.
//!
//! # Invariants Tested
//!
//! 1. **Deletion only after the volume deletion day**: a volume is deleted
//!    only when today is past its `volume-delete-time` day
//! 2. **Snapshot safety**: without a completed snapshot inside the staleness
//!    window the volume is kept, unless the requirement is switched off
//! 3. **Error isolation**: a failure on one volume never prevents the
//!    others from being processed

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use hubsweep_core::tags::{SERVER_STOP_TIME_TAG, VOLUME_DELETE_TIME_TAG};
use hubsweep_core::SnapshotStatus;
use hubsweep_gc::{SweepKind, SweepRun, VolumeSweep, RUN_LEVEL_RESOURCE_ID};
use hubsweep_test_utils::{
    init_test_logging, test_config, utc, SnapshotBuilder, TestContext, VolumeBuilder,
};

fn sweep(ctx: &TestContext) -> VolumeSweep {
    VolumeSweep::new(ctx.store.clone(), ctx.transport.clone(), ctx.config.clone())
}

/// Volume stopped 01-01 and due for deletion after 01-05.
fn expiring(id: &str, owner_key: &str) -> VolumeBuilder {
    VolumeBuilder::new(id, owner_key).timeline(utc(2024, 1, 1), utc(2024, 1, 5))
}

fn backup(id: &str, owner_key: &str, day: u32) -> SnapshotBuilder {
    SnapshotBuilder::new(id, owner_key).started(utc(2024, 1, day))
}

fn error_ids(run: &SweepRun) -> Vec<&str> {
    run.errors.iter().map(|r| r.resource_id.as_str()).collect()
}

#[tokio::test]
async fn expired_volume_with_fresh_snapshot_is_deleted() {
    init_test_logging();
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(backup("snap-1", "claim-alice", 9).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.kind, SweepKind::Volume);
    assert_eq!(run.deleted, 1);
    assert!(!run.has_errors());
    assert_eq!(ctx.store.deleted_volumes(), ["vol-1"]);
    assert!(ctx.transport.sent().is_empty());
}

#[tokio::test]
async fn volume_kept_through_its_deletion_day() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(backup("snap-1", "claim-alice", 5).build());

    for day in [1, 3, 5] {
        let run = sweep(&ctx).run_at(utc(2024, 1, day)).await;
        assert_eq!(run.deleted, 0, "day {day}");
    }
    let run = sweep(&ctx).run_at(utc(2024, 1, 6)).await;

    assert_eq!(run.deleted, 1);
}

#[tokio::test]
async fn stale_snapshot_does_not_satisfy_safety_check() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(backup("snap-1", "claim-alice", 7).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.deleted, 0);
    assert_eq!(run.skipped, 1);
    assert!(!run.has_errors());
    assert_eq!(ctx.store.volume_ids(), ["vol-1"]);
}

#[tokio::test]
async fn incomplete_or_foreign_snapshots_do_not_count() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(
        backup("pending", "claim-alice", 9)
            .status(SnapshotStatus::Pending)
            .build(),
    );
    ctx.store.insert_snapshot(backup("bob", "claim-bob", 9).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.deleted, 0);
    assert_eq!(ctx.store.volume_ids(), ["vol-1"]);
}

#[tokio::test]
async fn ignoring_snapshot_requirement_deletes_without_backup() {
    let mut config = test_config();
    config.ignore_snapshot_requirement = true;
    let ctx = TestContext::with_config(config);
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.deleted, 1);
    assert_eq!(ctx.store.volume_ids(), Vec::<String>::new());
}

#[tokio::test]
async fn staleness_window_is_configurable() {
    let mut config = test_config();
    config.snapshot_staleness_days = 5;
    let ctx = TestContext::with_config(config);
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(backup("snap-1", "claim-alice", 7).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.deleted, 1);
}

#[tokio::test]
async fn protected_volumes_are_never_deleted() {
    let mut config = test_config();
    config.ignore_snapshot_requirement = true;
    let ctx = TestContext::with_config(config);
    ctx.store.insert_volume(expiring("pinned", "claim-alice").do_not_delete().build());
    ctx.store.insert_volume(expiring("hub", "hub-db-dir").build());

    let run = sweep(&ctx).run_at(utc(2024, 3, 1)).await;

    assert_eq!(run.skipped, 2);
    assert!(ctx.store.deleted_volumes().is_empty());
}

#[tokio::test]
async fn legacy_and_incomplete_tags_are_skipped() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("legacy", "claim-alice").legacy().build());
    ctx.store.insert_volume(
        VolumeBuilder::new("no-delete-time", "claim-bob")
            .tag(SERVER_STOP_TIME_TAG, "2024-01-01 00:00:00+00:00")
            .build(),
    );
    ctx.store.insert_volume(VolumeBuilder::new("untagged", "claim-carol").build());

    let run = sweep(&ctx).run_at(utc(2024, 3, 1)).await;

    assert_eq!(run.examined, 3);
    assert_eq!(run.skipped, 3);
    assert!(!run.has_errors());
    assert!(ctx.store.deleted_volumes().is_empty());
}

#[tokio::test]
async fn invalid_timelines_are_reported() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(
        VolumeBuilder::new("reversed", "claim-alice")
            .timeline(utc(2024, 1, 10), utc(2024, 1, 5))
            .build(),
    );
    ctx.store.insert_volume(
        VolumeBuilder::new("garbled", "claim-bob")
            .tag(SERVER_STOP_TIME_TAG, "2024-01-01 00:00:00+00:00")
            .tag(VOLUME_DELETE_TIME_TAG, "soon")
            .build(),
    );

    let run = sweep(&ctx).run_at(utc(2024, 3, 1)).await;

    assert_eq!(error_ids(&run), ["reversed", "garbled"]);
    assert!(ctx.store.deleted_volumes().is_empty());

    let reports = ctx.transport.sent_to("osl-admin");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].subject, "OpenScienceLab Volume CronJob Errors");
    assert!(reports[0].html_body.contains("<td>garbled</td>"));
}

#[tokio::test]
async fn deletion_failure_is_isolated() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-a", "claim-alice").build());
    ctx.store.insert_volume(expiring("vol-b", "claim-bob").build());
    ctx.store.insert_snapshot(backup("snap-a", "claim-alice", 9).build());
    ctx.store.insert_snapshot(backup("snap-b", "claim-bob", 9).build());
    ctx.store.inject_failure_once("vol-a");

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(error_ids(&run), ["vol-a"]);
    assert_eq!(run.deleted, 1);
    assert_eq!(ctx.store.volume_ids(), ["vol-a"]);

    let rerun = sweep(&ctx).run_at(utc(2024, 1, 10)).await;
    assert!(!rerun.has_errors());
    assert!(ctx.store.volume_ids().is_empty());
}

#[tokio::test]
async fn snapshot_listing_failure_is_recorded_per_volume() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.fail_snapshot_listing();

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(error_ids(&run), ["vol-1"]);
    assert_eq!(ctx.store.volume_ids(), ["vol-1"]);
}

#[tokio::test]
async fn volume_listing_failure_ends_run() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.fail_volume_listing();

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(error_ids(&run), [RUN_LEVEL_RESOURCE_ID]);
    assert_eq!(run.examined, 0);
    assert_eq!(ctx.transport.sent_to("osl-admin").len(), 1);
}

#[tokio::test]
async fn unowned_volumes_are_not_listed() {
    let ctx = TestContext::new();
    ctx.store.insert_volume(
        VolumeBuilder::unowned("orphan")
            .timeline(utc(2024, 1, 1), utc(2024, 1, 5))
            .build(),
    );

    let run = sweep(&ctx).run_at(utc(2024, 3, 1)).await;

    assert_eq!(run.examined, 0);
    assert_eq!(ctx.store.volume_ids(), ["orphan"]);
}

#[tokio::test]
async fn dry_run_keeps_volumes() {
    let mut config = test_config();
    config.dry_run = true;
    let ctx = TestContext::with_config(config);
    ctx.store.insert_volume(expiring("vol-1", "claim-alice").build());
    ctx.store.insert_snapshot(backup("snap-1", "claim-alice", 9).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(run.deleted, 1);
    assert_eq!(ctx.store.volume_ids(), ["vol-1"]);
    assert!(ctx.store.deleted_volumes().is_empty());
}

#[tokio::test]
async fn unrepresentable_staleness_window_is_recorded_per_volume() {
    let mut config = test_config();
    config.snapshot_staleness_days = 100_000_000;
    let ctx = TestContext::with_config(config);
    ctx.store.insert_volume(expiring("vol-a", "claim-alice").build());
    ctx.store.insert_volume(expiring("vol-b", "claim-bob").build());
    ctx.store.insert_snapshot(backup("snap-a", "claim-alice", 9).build());

    let run = sweep(&ctx).run_at(utc(2024, 1, 10)).await;

    assert_eq!(error_ids(&run), ["vol-a", "vol-b"]);
    assert!(run.errors[0].message.contains("100000000 days"));
    assert_eq!(ctx.store.volume_ids(), ["vol-a", "vol-b"]);
    assert_eq!(ctx.transport.sent_to("osl-admin").len(), 1);
}
