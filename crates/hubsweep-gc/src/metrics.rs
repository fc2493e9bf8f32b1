//! Sweep metrics.
//!
//! Recorded through the `metrics` facade; the host process installs the
//! recorder. These complement the structured completion logs.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Resources deleted counter.
pub const RESOURCES_DELETED: &str = "hubsweep_resources_deleted_total";

/// Emails sent counter.
pub const EMAILS_SENT: &str = "hubsweep_emails_sent_total";

/// Recorded sweep errors counter.
pub const SWEEP_ERRORS: &str = "hubsweep_sweep_errors_total";

/// Sweep duration histogram.
pub const SWEEP_DURATION: &str = "hubsweep_sweep_duration_seconds";

/// Registers all metric descriptions.
///
/// Call once at start-up after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(RESOURCES_DELETED, "Total volumes and snapshots deleted");
    describe_counter!(EMAILS_SENT, "Total emails sent by template");
    describe_counter!(SWEEP_ERRORS, "Total errors recorded in sweep reports");
    describe_histogram!(SWEEP_DURATION, "Duration of sweep runs in seconds");
}

/// Records a deletion. `reason` is `duplicate` or `expired`.
pub fn record_deletion(kind: &'static str, reason: &'static str) {
    counter!(RESOURCES_DELETED, "kind" => kind, "reason" => reason).increment(1);
}

/// Records a sent email.
pub fn record_email(template: &'static str) {
    counter!(EMAILS_SENT, "template" => template).increment(1);
}

/// Records an error added to a run report.
pub fn record_error(kind: &'static str, error: &'static str) {
    counter!(SWEEP_ERRORS, "kind" => kind, "error" => error).increment(1);
}

/// Records a completed run.
pub fn record_run(kind: &'static str, duration_secs: f64) {
    histogram!(SWEEP_DURATION, "kind" => kind).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        register_metrics();
        record_deletion("snapshot", "duplicate");
        record_email("warning");
        record_error("volume", "transient");
        record_run("volume", 0.25);
    }
}
