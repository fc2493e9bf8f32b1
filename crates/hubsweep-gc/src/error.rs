//! Errors recorded against a sweep run.
//!
//! Skip conditions are not errors; see [`crate::report::Skip`].

use chrono::NaiveDate;
use hubsweep_core::TimelineError;

/// Result type alias for sweep item processing.
pub type Result<T> = std::result::Result<T, SweepError>;

/// A failure that lands in the admin report.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// Lifecycle tags are unparseable or out of order. The resource is untouched.
    #[error("invalid lifecycle tags: {0}")]
    InvalidTimeline(#[from] TimelineError),

    /// The resource outlived its deletion day. It is left for an operator.
    #[error(
        "past snapshot deletion day {snapshot_delete} (today {today}); \
         tagging or the snapshot pipeline may be broken"
    )]
    Overdue {
        /// Scheduled deletion day.
        snapshot_delete: NaiveDate,
        /// Day of the run.
        today: NaiveDate,
    },

    /// The snapshot staleness window cannot be applied to the run time.
    #[error("snapshot staleness window of {days} days is out of range")]
    StalenessOutOfRange {
        /// Configured window.
        days: u32,
    },

    /// A store or email call failed while processing one resource.
    #[error(transparent)]
    Transient(#[from] hubsweep_core::Error),

    /// The initial listing failed; no resource was processed.
    #[error("listing resources failed: {0}")]
    RunFailure(#[source] hubsweep_core::Error),
}

impl SweepError {
    /// Short label for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTimeline(_) => "invalid_timeline",
            Self::Overdue { .. } => "overdue",
            Self::StalenessOutOfRange { .. } => "staleness_out_of_range",
            Self::Transient(_) => "transient",
            Self::RunFailure(_) => "run_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 15).expect("date");
        let errors = [
            SweepError::InvalidTimeline(TimelineError::Malformed {
                tag: "server-stop-time",
                value: "x".to_string(),
            }),
            SweepError::Overdue {
                snapshot_delete: day,
                today: day,
            },
            SweepError::StalenessOutOfRange { days: u32::MAX },
            SweepError::Transient(hubsweep_core::Error::store("boom")),
            SweepError::RunFailure(hubsweep_core::Error::store("boom")),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(SweepError::kind).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn transient_is_transparent() {
        let err = SweepError::from(hubsweep_core::Error::store("delete rejected"));
        assert_eq!(err.to_string(), "resource store error: delete rejected");
    }
}
