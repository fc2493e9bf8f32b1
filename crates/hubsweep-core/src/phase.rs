//! Day-granularity phase evaluation for snapshot timelines.
//!
//! The sweep runs once a day, so every comparison happens on calendar dates
//! and sub-day precision is discarded.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timeline::LifecycleTimeline;

/// Day offsets from the server stop at which users are emailed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationThresholds {
    /// Offsets at which a warning email is due.
    #[serde(default)]
    pub warning_days: Vec<i64>,
    /// Offset at which the final warning / deletion email is due.
    #[serde(default)]
    pub deletion_email_day: Option<i64>,
}

impl NotificationThresholds {
    /// Creates thresholds.
    #[must_use]
    pub fn new(warning_days: impl Into<Vec<i64>>, deletion_email_day: Option<i64>) -> Self {
        Self {
            warning_days: warning_days.into(),
            deletion_email_day,
        }
    }
}

/// Where a timeline stands on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// On or before the stop day.
    Active,
    /// After the stop, up to and including the volume deletion day.
    AwaitingVolumeDeletion,
    /// After volume deletion, up to and including the snapshot deletion day.
    SnapshotRetention,
    /// Past the snapshot deletion day.
    Overdue,
}

impl Phase {
    /// Classifies `today` against `timeline`.
    #[must_use]
    pub fn of(today: NaiveDate, timeline: &LifecycleTimeline) -> Self {
        if today <= timeline.stop_date() {
            Self::Active
        } else if today <= timeline.volume_delete_date() {
            Self::AwaitingVolumeDeletion
        } else if today <= timeline.snapshot_delete_date() {
            Self::SnapshotRetention
        } else {
            Self::Overdue
        }
    }
}

/// Something the sweep must do for a resource today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Send a storage warning email.
    SendWarningEmail,
    /// Send the deletion email.
    SendDeletionEmail,
    /// Delete the resource.
    DeleteResource,
    /// Past deletion without having been deleted.
    Overdue,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::SendWarningEmail => "send_warning_email",
            Self::SendDeletionEmail => "send_deletion_email",
            Self::DeleteResource => "delete_resource",
            Self::Overdue => "overdue",
        };
        f.write_str(name)
    }
}

/// Decides today's actions for a snapshot timeline.
///
/// Pure function of its inputs. During the retention window the warning,
/// deletion-email and delete triggers fire independently and may coincide;
/// if none fires the result is `{None}`. Emails sort before deletion, so
/// iterating the set executes them in a safe order.
#[must_use]
pub fn evaluate(
    today: NaiveDate,
    timeline: &LifecycleTimeline,
    thresholds: &NotificationThresholds,
) -> BTreeSet<Action> {
    let mut actions = BTreeSet::new();
    match Phase::of(today, timeline) {
        Phase::Active | Phase::AwaitingVolumeDeletion => {}
        Phase::SnapshotRetention => {
            let days_since_stop = (today - timeline.stop_date()).num_days();
            if thresholds.warning_days.contains(&days_since_stop) {
                actions.insert(Action::SendWarningEmail);
            }
            if thresholds.deletion_email_day == Some(days_since_stop) {
                actions.insert(Action::SendDeletionEmail);
            }
            if today == timeline.snapshot_delete_date() {
                actions.insert(Action::DeleteResource);
            }
        }
        Phase::Overdue => {
            actions.insert(Action::Overdue);
        }
    }
    if actions.is_empty() {
        actions.insert(Action::None);
    }
    actions
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn timeline() -> LifecycleTimeline {
        LifecycleTimeline::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 15, 9, 30, 0).unwrap(),
        )
        .unwrap()
    }

    fn thresholds() -> NotificationThresholds {
        NotificationThresholds::new(vec![30, 40], Some(44))
    }

    fn actions(list: &[Action]) -> BTreeSet<Action> {
        list.iter().copied().collect()
    }

    #[test]
    fn documented_timeline_scenario() {
        let cases = [
            (date(2023, 12, 31), vec![Action::None]),
            (date(2024, 1, 1), vec![Action::None]),
            (date(2024, 1, 3), vec![Action::None]),
            (date(2024, 1, 5), vec![Action::None]),
            (date(2024, 1, 6), vec![Action::None]),
            (date(2024, 1, 31), vec![Action::SendWarningEmail]),
            (date(2024, 2, 10), vec![Action::SendWarningEmail]),
            (date(2024, 2, 14), vec![Action::SendDeletionEmail]),
            (date(2024, 2, 15), vec![Action::DeleteResource]),
            (date(2024, 2, 20), vec![Action::Overdue]),
        ];
        for (today, expected) in cases {
            assert_eq!(
                evaluate(today, &timeline(), &thresholds()),
                actions(&expected),
                "today = {today}"
            );
        }
    }

    #[test]
    fn triggers_fire_together() {
        let thresholds = NotificationThresholds::new(vec![45], Some(45));
        assert_eq!(
            evaluate(date(2024, 2, 15), &timeline(), &thresholds),
            actions(&[
                Action::SendWarningEmail,
                Action::SendDeletionEmail,
                Action::DeleteResource
            ])
        );
    }

    #[test]
    fn emails_are_ordered_before_deletion() {
        let thresholds = NotificationThresholds::new(vec![45], Some(45));
        let ordered: Vec<_> = evaluate(date(2024, 2, 15), &timeline(), &thresholds)
            .into_iter()
            .collect();
        assert_eq!(ordered.last(), Some(&Action::DeleteResource));
    }

    #[test]
    fn warning_offset_inside_volume_window_does_not_fire() {
        let thresholds = NotificationThresholds::new(vec![2], None);
        assert_eq!(
            evaluate(date(2024, 1, 3), &timeline(), &thresholds),
            actions(&[Action::None])
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        for offset in 0..60 {
            let today = date(2024, 1, 1) + chrono::Duration::days(offset);
            assert_eq!(
                evaluate(today, &timeline(), &thresholds()),
                evaluate(today, &timeline(), &thresholds())
            );
        }
    }

    #[test]
    fn phase_boundaries() {
        let t = timeline();
        assert_eq!(Phase::of(date(2024, 1, 1), &t), Phase::Active);
        assert_eq!(Phase::of(date(2024, 1, 2), &t), Phase::AwaitingVolumeDeletion);
        assert_eq!(Phase::of(date(2024, 1, 6), &t), Phase::SnapshotRetention);
        assert_eq!(Phase::of(date(2024, 2, 15), &t), Phase::SnapshotRetention);
        assert_eq!(Phase::of(date(2024, 2, 16), &t), Phase::Overdue);
    }
}
