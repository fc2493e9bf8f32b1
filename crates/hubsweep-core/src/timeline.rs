//! Lifecycle timelines reconstructed from resource tags.
//!
//! The stop hook writes three instants onto a volume when its server stops,
//! and the snapshot job copies them onto each snapshot:
//!
//! ```text
//! server-stop-time  <=  volume-delete-time  <=  snapshot-delete-time
//! ```
//!
//! Tagging that breaks this ordering is reported, never corrected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tags::{
    TagSet, LEGACY_STOPPING_TIME_TAG, SERVER_STOP_TIME_TAG, SNAPSHOT_DELETE_TIME_TAG,
    VOLUME_DELETE_TIME_TAG,
};

/// Format written by the stop hook (`2024-01-01 12:30:00+00:00`).
pub const TAG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Why a resource is left alone without recording an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tagged with the single-tag schema that predates lifecycle tags.
    LegacySchema,
    /// A required lifecycle tag is missing.
    MissingTag(&'static str),
}

/// Tag state that cannot be turned into a valid timeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// A tag value is not a timestamp.
    #[error("tag '{tag}' has unparseable timestamp '{value}'")]
    Malformed {
        /// Tag key.
        tag: &'static str,
        /// Raw tag value.
        value: String,
    },

    /// Two instants are in the wrong order.
    #[error("'{later_tag}' ({later}) is before '{earlier_tag}' ({earlier})")]
    OutOfOrder {
        /// Tag that must come first.
        earlier_tag: &'static str,
        /// Its value.
        earlier: DateTime<Utc>,
        /// Tag that must come second.
        later_tag: &'static str,
        /// Its value.
        later: DateTime<Utc>,
    },
}

/// Result of reading a timeline: either usable, or a reason to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    /// All required tags present and ordered.
    Ready(T),
    /// Resource is left alone.
    Skip(SkipReason),
}

/// The full snapshot timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleTimeline {
    /// Last server stop.
    pub stop: DateTime<Utc>,
    /// Volume deletion.
    pub volume_delete: DateTime<Utc>,
    /// Snapshot deletion.
    pub snapshot_delete: DateTime<Utc>,
}

impl LifecycleTimeline {
    /// Builds a timeline, enforcing the ordering invariant.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::OutOfOrder`] if `stop > volume_delete` or
    /// `volume_delete > snapshot_delete`.
    pub fn new(
        stop: DateTime<Utc>,
        volume_delete: DateTime<Utc>,
        snapshot_delete: DateTime<Utc>,
    ) -> Result<Self, TimelineError> {
        ensure_ordered(SERVER_STOP_TIME_TAG, stop, VOLUME_DELETE_TIME_TAG, volume_delete)?;
        ensure_ordered(
            VOLUME_DELETE_TIME_TAG,
            volume_delete,
            SNAPSHOT_DELETE_TIME_TAG,
            snapshot_delete,
        )?;
        Ok(Self {
            stop,
            volume_delete,
            snapshot_delete,
        })
    }

    /// Reads the timeline from snapshot tags.
    ///
    /// # Errors
    ///
    /// Returns a [`TimelineError`] if a tag is unparseable or the instants are
    /// out of order. Missing tags and the legacy schema are not errors.
    pub fn from_tags(tags: &TagSet) -> Result<Parsed<Self>, TimelineError> {
        if tags.has(LEGACY_STOPPING_TIME_TAG) {
            return Ok(Parsed::Skip(SkipReason::LegacySchema));
        }
        let raw = match required(
            tags,
            [
                SERVER_STOP_TIME_TAG,
                VOLUME_DELETE_TIME_TAG,
                SNAPSHOT_DELETE_TIME_TAG,
            ],
        ) {
            Ok(raw) => raw,
            Err(reason) => return Ok(Parsed::Skip(reason)),
        };

        let stop = parse_tag_time(SERVER_STOP_TIME_TAG, raw[0])?;
        let volume_delete = parse_tag_time(VOLUME_DELETE_TIME_TAG, raw[1])?;
        let snapshot_delete = parse_tag_time(SNAPSHOT_DELETE_TIME_TAG, raw[2])?;
        Self::new(stop, volume_delete, snapshot_delete).map(Parsed::Ready)
    }

    /// Day of the last server stop.
    #[must_use]
    pub fn stop_date(&self) -> NaiveDate {
        self.stop.date_naive()
    }

    /// Day of volume deletion.
    #[must_use]
    pub fn volume_delete_date(&self) -> NaiveDate {
        self.volume_delete.date_naive()
    }

    /// Day of snapshot deletion.
    #[must_use]
    pub fn snapshot_delete_date(&self) -> NaiveDate {
        self.snapshot_delete.date_naive()
    }
}

/// The two-instant timeline the volume sweep needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTimeline {
    /// Last server stop.
    pub stop: DateTime<Utc>,
    /// Volume deletion.
    pub volume_delete: DateTime<Utc>,
}

impl VolumeTimeline {
    /// Reads the volume timeline from volume tags.
    ///
    /// # Errors
    ///
    /// Returns a [`TimelineError`] if a tag is unparseable or the stop time is
    /// after the volume deletion time.
    pub fn from_tags(tags: &TagSet) -> Result<Parsed<Self>, TimelineError> {
        if tags.has(LEGACY_STOPPING_TIME_TAG) {
            return Ok(Parsed::Skip(SkipReason::LegacySchema));
        }
        let raw = match required(tags, [SERVER_STOP_TIME_TAG, VOLUME_DELETE_TIME_TAG]) {
            Ok(raw) => raw,
            Err(reason) => return Ok(Parsed::Skip(reason)),
        };

        let stop = parse_tag_time(SERVER_STOP_TIME_TAG, raw[0])?;
        let volume_delete = parse_tag_time(VOLUME_DELETE_TIME_TAG, raw[1])?;
        ensure_ordered(SERVER_STOP_TIME_TAG, stop, VOLUME_DELETE_TIME_TAG, volume_delete)?;
        Ok(Parsed::Ready(Self {
            stop,
            volume_delete,
        }))
    }

    /// Day of volume deletion.
    #[must_use]
    pub fn volume_delete_date(&self) -> NaiveDate {
        self.volume_delete.date_naive()
    }
}

fn required<'a, const N: usize>(
    tags: &'a TagSet,
    keys: [&'static str; N],
) -> Result<[&'a str; N], SkipReason> {
    let mut values = [""; N];
    for (slot, key) in values.iter_mut().zip(keys) {
        *slot = tags.get(key).ok_or(SkipReason::MissingTag(key))?;
    }
    Ok(values)
}

fn ensure_ordered(
    earlier_tag: &'static str,
    earlier: DateTime<Utc>,
    later_tag: &'static str,
    later: DateTime<Utc>,
) -> Result<(), TimelineError> {
    if earlier > later {
        return Err(TimelineError::OutOfOrder {
            earlier_tag,
            earlier,
            later_tag,
            later,
        });
    }
    Ok(())
}

/// Parses a lifecycle tag value.
///
/// Accepts the stop hook's format and RFC 3339.
///
/// # Errors
///
/// Returns [`TimelineError::Malformed`] if neither format matches.
pub fn parse_tag_time(tag: &'static str, value: &str) -> Result<DateTime<Utc>, TimelineError> {
    let value = value.trim();
    DateTime::parse_from_str(value, TAG_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimelineError::Malformed {
            tag,
            value: value.to_string(),
        })
}

/// Formats an instant the way the stop hook writes it.
#[must_use]
pub fn format_tag_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tags(stop: &str, volume: &str, snapshot: &str) -> TagSet {
        TagSet::new()
            .with(SERVER_STOP_TIME_TAG, stop)
            .with(VOLUME_DELETE_TIME_TAG, volume)
            .with(SNAPSHOT_DELETE_TIME_TAG, snapshot)
    }

    #[test]
    fn parses_hook_format() {
        let parsed = LifecycleTimeline::from_tags(&tags(
            "2024-01-01 10:15:00+00:00",
            "2024-01-05 10:15:00+00:00",
            "2024-02-15 10:15:00+00:00",
        ))
        .expect("valid");
        let Parsed::Ready(timeline) = parsed else {
            panic!("expected timeline, got {parsed:?}");
        };
        assert_eq!(
            timeline.stop,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 0).unwrap()
        );
        assert_eq!(
            timeline.snapshot_delete_date(),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
        );
    }

    #[test]
    fn accepts_fractional_seconds_and_rfc3339() {
        assert!(parse_tag_time(SERVER_STOP_TIME_TAG, "2024-01-01 10:15:00.123456+00:00").is_ok());
        assert!(parse_tag_time(SERVER_STOP_TIME_TAG, "2024-01-01T10:15:00Z").is_ok());
    }

    #[test]
    fn format_round_trips_through_parser() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        let text = format_tag_time(instant);
        assert_eq!(text, "2024-03-09 07:05:00+00:00");
        assert_eq!(parse_tag_time(SERVER_STOP_TIME_TAG, &text), Ok(instant));
    }

    #[test]
    fn missing_tag_is_a_skip() {
        let tags = TagSet::new()
            .with(SERVER_STOP_TIME_TAG, "2024-01-01 00:00:00+00:00")
            .with(VOLUME_DELETE_TIME_TAG, "2024-01-05 00:00:00+00:00");
        assert_eq!(
            LifecycleTimeline::from_tags(&tags),
            Ok(Parsed::Skip(SkipReason::MissingTag(SNAPSHOT_DELETE_TIME_TAG)))
        );
    }

    #[test]
    fn legacy_schema_is_a_skip() {
        let tags = TagSet::new().with(LEGACY_STOPPING_TIME_TAG, "2021-06-01 00:00:00+00:00");
        assert_eq!(
            LifecycleTimeline::from_tags(&tags),
            Ok(Parsed::Skip(SkipReason::LegacySchema))
        );
        assert_eq!(
            VolumeTimeline::from_tags(&tags),
            Ok(Parsed::Skip(SkipReason::LegacySchema))
        );
    }

    #[test]
    fn volume_delete_before_stop_is_an_error() {
        let err = LifecycleTimeline::from_tags(&tags(
            "2024-01-05 00:00:00+00:00",
            "2024-01-01 00:00:00+00:00",
            "2024-02-15 00:00:00+00:00",
        ))
        .expect_err("out of order");
        assert!(matches!(
            err,
            TimelineError::OutOfOrder {
                earlier_tag: SERVER_STOP_TIME_TAG,
                later_tag: VOLUME_DELETE_TIME_TAG,
                ..
            }
        ));
    }

    #[test]
    fn snapshot_delete_before_volume_delete_is_an_error() {
        let err = LifecycleTimeline::from_tags(&tags(
            "2024-01-01 00:00:00+00:00",
            "2024-02-20 00:00:00+00:00",
            "2024-02-15 00:00:00+00:00",
        ))
        .expect_err("out of order");
        assert!(matches!(
            err,
            TimelineError::OutOfOrder {
                earlier_tag: VOLUME_DELETE_TIME_TAG,
                ..
            }
        ));
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let err = LifecycleTimeline::from_tags(&tags(
            "yesterday",
            "2024-01-05 00:00:00+00:00",
            "2024-02-15 00:00:00+00:00",
        ))
        .expect_err("malformed");
        assert_eq!(
            err,
            TimelineError::Malformed {
                tag: SERVER_STOP_TIME_TAG,
                value: "yesterday".to_string()
            }
        );
    }

    #[test]
    fn equal_instants_are_ordered() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(LifecycleTimeline::new(t, t, t).is_ok());
    }

    #[test]
    fn volume_timeline_ignores_snapshot_tag() {
        let tags = TagSet::new()
            .with(SERVER_STOP_TIME_TAG, "2024-01-01 00:00:00+00:00")
            .with(VOLUME_DELETE_TIME_TAG, "2024-01-05 00:00:00+00:00");
        let parsed = VolumeTimeline::from_tags(&tags).expect("valid");
        assert!(matches!(parsed, Parsed::Ready(_)));
    }
}
