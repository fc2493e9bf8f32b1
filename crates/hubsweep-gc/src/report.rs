//! Per-run outcome: counters, skip conditions and the error list that feeds
//! the admin report.

use std::fmt;

use hubsweep_core::{OwnerKeyError, SkipReason};

use crate::error::SweepError;

/// Resource id used for errors that are not tied to one resource.
pub const RUN_LEVEL_RESOURCE_ID: &str = "N/A";

/// Which sweep produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    /// Snapshot sweep.
    Snapshot,
    /// Volume sweep.
    Volume,
}

impl SweepKind {
    /// Label used in spans and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Volume => "volume",
        }
    }

    /// Human name for the admin report subject.
    #[must_use]
    pub fn report_name(self) -> &'static str {
        match self {
            Self::Snapshot => "Snapshot",
            Self::Volume => "Volume",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a resource was left alone without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// No owner-key tag.
    MissingOwnerKey,
    /// Owner key is on the protected list.
    ProtectedOwner,
    /// Tagged `do-not-delete`.
    DoNotDelete,
    /// Snapshot has no start time.
    MissingStartTime,
    /// Owner key does not map to a username.
    UnresolvableOwner(OwnerKeyError),
    /// Tags are in the legacy schema or incomplete.
    Timeline(SkipReason),
    /// A volume for the owner still exists in the cluster.
    SourceVolumeExists,
    /// Volume is no longer detached.
    NotAvailable,
    /// No recent completed snapshot backs the volume.
    NoFreshSnapshot,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOwnerKey => f.write_str("no owner key tag"),
            Self::ProtectedOwner => f.write_str("protected owner key"),
            Self::DoNotDelete => f.write_str("tagged do-not-delete"),
            Self::MissingStartTime => f.write_str("no start time"),
            Self::UnresolvableOwner(err) => write!(f, "{err}"),
            Self::Timeline(SkipReason::LegacySchema) => f.write_str("legacy lifecycle tags"),
            Self::Timeline(SkipReason::MissingTag(tag)) => write!(f, "missing tag '{tag}'"),
            Self::SourceVolumeExists => f.write_str("a volume for the owner still exists"),
            Self::NotAvailable => f.write_str("volume is not available"),
            Self::NoFreshSnapshot => f.write_str("no recent completed snapshot"),
        }
    }
}

/// One row of the admin report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Offending resource id, or [`RUN_LEVEL_RESOURCE_ID`].
    pub resource_id: String,
    /// Error description.
    pub message: String,
}

/// Outcome of one sweep run.
#[derive(Debug, Clone)]
pub struct SweepRun {
    /// Sweep that produced the run.
    pub kind: SweepKind,
    /// Whether mutations were only logged.
    pub dry_run: bool,
    /// Resources evaluated after listing and deduplication.
    pub examined: u64,
    /// Resources deleted by lifecycle rules.
    pub deleted: u64,
    /// Older duplicate snapshots deleted.
    pub duplicates_deleted: u64,
    /// Warning emails sent.
    pub warning_emails: u64,
    /// Deletion emails sent.
    pub deletion_emails: u64,
    /// Resources skipped without error.
    pub skipped: u64,
    /// Errors in the order they were recorded.
    pub errors: Vec<ReportRow>,
}

impl SweepRun {
    /// Creates an empty run.
    #[must_use]
    pub fn new(kind: SweepKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            examined: 0,
            deleted: 0,
            duplicates_deleted: 0,
            warning_emails: 0,
            deletion_emails: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    /// Records an error against `resource_id` and logs it.
    pub fn record_error(&mut self, resource_id: &str, error: &SweepError) {
        tracing::error!(
            resource_id,
            error = %error,
            error_kind = error.kind(),
            metric = "hubsweep_sweep_errors_total",
            "sweep error"
        );
        crate::metrics::record_error(self.kind.as_str(), error.kind());
        self.errors.push(ReportRow {
            resource_id: resource_id.to_string(),
            message: error.to_string(),
        });
    }

    /// Records a skip and logs the reason.
    pub fn record_skip(&mut self, resource_id: &str, skip: &Skip) {
        match skip {
            Skip::Timeline(SkipReason::LegacySchema) | Skip::DoNotDelete => {
                tracing::debug!(resource_id, reason = %skip, "skipping resource");
            }
            _ => tracing::warn!(resource_id, reason = %skip, "skipping resource"),
        }
        self.skipped += 1;
    }

    /// Returns true if any errors were recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_keep_recording_order() {
        let mut run = SweepRun::new(SweepKind::Volume, false);
        run.record_error(
            "vol-2",
            &SweepError::Transient(hubsweep_core::Error::store("throttled")),
        );
        run.record_error(
            RUN_LEVEL_RESOURCE_ID,
            &SweepError::RunFailure(hubsweep_core::Error::store("denied")),
        );

        assert!(run.has_errors());
        let ids: Vec<_> = run.errors.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, ["vol-2", "N/A"]);
        assert!(run.errors[1].message.contains("denied"));
    }

    #[test]
    fn skips_are_counted_not_reported() {
        let mut run = SweepRun::new(SweepKind::Snapshot, true);
        run.record_skip("snap-1", &Skip::Timeline(SkipReason::LegacySchema));
        run.record_skip("snap-2", &Skip::SourceVolumeExists);
        assert_eq!(run.skipped, 2);
        assert!(!run.has_errors());
    }

    #[test]
    fn skip_messages_name_the_tag() {
        let skip = Skip::Timeline(SkipReason::MissingTag("server-stop-time"));
        assert_eq!(skip.to_string(), "missing tag 'server-stop-time'");
    }
}
