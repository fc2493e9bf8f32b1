//! Sweep configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::owner::{ProtectedOwnerKeys, HUB_DATABASE_OWNER_KEY};
use crate::phase::NotificationThresholds;

/// Default age (days) after which a snapshot no longer counts as a backup.
pub const DEFAULT_SNAPSHOT_STALENESS_DAYS: u32 = 2;

/// Default admin user that receives reports and is cc'd on user emails.
pub const DEFAULT_ADMIN_USERNAME: &str = "osl-admin";

/// Largest accepted snapshot staleness window, in days.
pub const MAX_SNAPSHOT_STALENESS_DAYS: u32 = 3650;

/// Configuration for one cluster's sweeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepConfig {
    /// Cluster whose resources are swept.
    pub cluster_name: String,
    /// Provider region.
    pub region: String,
    /// Short lab name used in user-facing emails. Defaults to the cluster name.
    #[serde(default)]
    pub lab_short_name: Option<String>,
    /// Portal base URL linked from user emails.
    #[serde(default)]
    pub portal_domain: String,
    /// Email day offsets.
    #[serde(default)]
    pub thresholds: NotificationThresholds,
    /// UTC hour the snapshot sweep runs; quoted in warning emails.
    #[serde(default)]
    pub snapshot_cron_utc_hour: u32,
    /// Snapshots older than this many days do not satisfy the volume safety check.
    #[serde(default = "default_staleness_days")]
    pub snapshot_staleness_days: u32,
    /// Log deletions and emails instead of executing them.
    #[serde(default)]
    pub dry_run: bool,
    /// Delete expired volumes even without a fresh snapshot.
    #[serde(default)]
    pub ignore_snapshot_requirement: bool,
    /// Owner keys never touched by either sweep.
    #[serde(default = "default_protected_owner_keys")]
    pub protected_owner_keys: Vec<String>,
    /// Admin username for reports.
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
}

impl SweepConfig {
    /// Creates a configuration with defaults for everything but the cluster.
    #[must_use]
    pub fn new(cluster_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            region: region.into(),
            lab_short_name: None,
            portal_domain: String::new(),
            thresholds: NotificationThresholds::default(),
            snapshot_cron_utc_hour: 0,
            snapshot_staleness_days: DEFAULT_SNAPSHOT_STALENESS_DAYS,
            dry_run: false,
            ignore_snapshot_requirement: false,
            protected_owner_keys: default_protected_owner_keys(),
            admin_username: default_admin_username(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// - `HUBSWEEP_CLUSTER_NAME` (required)
    /// - `HUBSWEEP_REGION` (required)
    /// - `HUBSWEEP_LAB_SHORT_NAME`
    /// - `HUBSWEEP_PORTAL_DOMAIN`
    /// - `HUBSWEEP_WARNING_DAYS` (`[30,40]` or `30,40`)
    /// - `HUBSWEEP_DELETION_EMAIL_DAY`
    /// - `HUBSWEEP_SNAPSHOT_CRON_UTC_HOUR`
    /// - `HUBSWEEP_SNAPSHOT_STALENESS_DAYS` (default: 2)
    /// - `HUBSWEEP_DRY_RUN`
    /// - `HUBSWEEP_IGNORE_SNAPSHOT_REQUIREMENT`
    /// - `HUBSWEEP_PROTECTED_OWNER_KEYS` (comma separated, default: `hub-db-dir`)
    /// - `HUBSWEEP_ADMIN_USERNAME`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a present variable
    /// cannot be parsed, or the result fails [`SweepConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`SweepConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).and_then(|v| {
                let trimmed = v.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        };

        let cluster_name = var("HUBSWEEP_CLUSTER_NAME")
            .ok_or_else(|| Error::InvalidInput("missing HUBSWEEP_CLUSTER_NAME".to_string()))?;
        let region = var("HUBSWEEP_REGION")
            .ok_or_else(|| Error::InvalidInput("missing HUBSWEEP_REGION".to_string()))?;
        let mut config = Self::new(cluster_name, region);

        config.lab_short_name = var("HUBSWEEP_LAB_SHORT_NAME");
        if let Some(domain) = var("HUBSWEEP_PORTAL_DOMAIN") {
            config.portal_domain = domain;
        }
        if let Some(days) = var("HUBSWEEP_WARNING_DAYS") {
            config.thresholds.warning_days = parse_day_list("HUBSWEEP_WARNING_DAYS", &days)?;
        }
        if let Some(day) = var("HUBSWEEP_DELETION_EMAIL_DAY") {
            config.thresholds.deletion_email_day =
                Some(parse_number("HUBSWEEP_DELETION_EMAIL_DAY", &day)?);
        }
        if let Some(hour) = var("HUBSWEEP_SNAPSHOT_CRON_UTC_HOUR") {
            config.snapshot_cron_utc_hour = parse_number("HUBSWEEP_SNAPSHOT_CRON_UTC_HOUR", &hour)?;
        }
        if let Some(days) = var("HUBSWEEP_SNAPSHOT_STALENESS_DAYS") {
            config.snapshot_staleness_days =
                parse_number("HUBSWEEP_SNAPSHOT_STALENESS_DAYS", &days)?;
        }
        if let Some(flag) = var("HUBSWEEP_DRY_RUN") {
            config.dry_run = parse_bool("HUBSWEEP_DRY_RUN", &flag)?;
        }
        if let Some(flag) = var("HUBSWEEP_IGNORE_SNAPSHOT_REQUIREMENT") {
            config.ignore_snapshot_requirement =
                parse_bool("HUBSWEEP_IGNORE_SNAPSHOT_REQUIREMENT", &flag)?;
        }
        if let Some(keys) = var("HUBSWEEP_PROTECTED_OWNER_KEYS") {
            config.protected_owner_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(admin) = var("HUBSWEEP_ADMIN_USERNAME") {
            config.admin_username = admin;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(Error::InvalidInput("cluster_name must not be empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::InvalidInput("region must not be empty".to_string()));
        }
        if self.snapshot_cron_utc_hour >= 24 {
            return Err(Error::InvalidInput(format!(
                "snapshot_cron_utc_hour must be below 24 (got {})",
                self.snapshot_cron_utc_hour
            )));
        }
        if self.snapshot_staleness_days == 0 {
            return Err(Error::InvalidInput(
                "snapshot_staleness_days must be at least 1".to_string(),
            ));
        }
        if self.snapshot_staleness_days > MAX_SNAPSHOT_STALENESS_DAYS {
            return Err(Error::InvalidInput(format!(
                "snapshot_staleness_days must be at most {MAX_SNAPSHOT_STALENESS_DAYS} (got {})",
                self.snapshot_staleness_days
            )));
        }
        if let Some(day) = self.thresholds.warning_days.iter().find(|d| **d < 0) {
            return Err(Error::InvalidInput(format!(
                "warning days must not be negative (got {day})"
            )));
        }
        if let Some(day) = self.thresholds.deletion_email_day.filter(|d| *d < 0) {
            return Err(Error::InvalidInput(format!(
                "deletion_email_day must not be negative (got {day})"
            )));
        }
        if self.admin_username.trim().is_empty() {
            return Err(Error::InvalidInput("admin_username must not be empty".to_string()));
        }
        Ok(())
    }

    /// Lab name for user-facing emails.
    #[must_use]
    pub fn lab_name(&self) -> &str {
        self.lab_short_name.as_deref().unwrap_or(&self.cluster_name)
    }

    /// Owner key policy built from `protected_owner_keys`.
    #[must_use]
    pub fn owner_key_policy(&self) -> ProtectedOwnerKeys {
        ProtectedOwnerKeys::new(self.protected_owner_keys.iter().cloned())
    }
}

fn default_staleness_days() -> u32 {
    DEFAULT_SNAPSHOT_STALENESS_DAYS
}

fn default_protected_owner_keys() -> Vec<String> {
    vec![HUB_DATABASE_OWNER_KEY.to_string()]
}

fn default_admin_username() -> String {
    DEFAULT_ADMIN_USERNAME.to_string()
}

fn parse_number<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::InvalidInput(format!("{name} must be a number: {e}")))
}

fn parse_day_list(name: &str, value: &str) -> Result<Vec<i64>> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| parse_number(name, d))
        .collect()
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}
