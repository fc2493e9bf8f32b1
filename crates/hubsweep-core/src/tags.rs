//! Read access to the key/value tags carried by volumes and snapshots.
//!
//! The platform keeps no database of its own: every piece of lifecycle state
//! lives in cloud resource tags written by the server stop hook. This module
//! is the only place that looks at the raw key/value pairs; everything above
//! it works with typed values.
//!
//! An empty tag value is treated the same as a missing tag.

use serde::{Deserialize, Serialize};

/// Tag holding the owner key (the persistent volume claim name).
pub const OWNER_KEY_TAG: &str = "kubernetes.io/created-for/pvc/name";

/// Prefix of the per-cluster ownership tag (`kubernetes.io/cluster/<name>`).
pub const CLUSTER_TAG_PREFIX: &str = "kubernetes.io/cluster/";

/// Value of the per-cluster ownership tag for resources the cluster owns.
pub const CLUSTER_OWNED_VALUE: &str = "owned";

/// Protection flag: resources carrying it are never deleted automatically.
pub const DO_NOT_DELETE_TAG: &str = "do-not-delete";

/// Time the owning server last stopped.
pub const SERVER_STOP_TIME_TAG: &str = "server-stop-time";

/// Time the volume becomes eligible for deletion.
pub const VOLUME_DELETE_TIME_TAG: &str = "volume-delete-time";

/// Time the snapshot is deleted.
pub const SNAPSHOT_DELETE_TIME_TAG: &str = "snapshot-delete-time";

/// Single-tag schema written before lifecycle tags existed.
pub const LEGACY_STOPPING_TIME_TAG: &str = "jupyter-volume-stopping-time";

/// Returns the ownership tag key for a cluster.
#[must_use]
pub fn cluster_tag(cluster_name: &str) -> String {
    format!("{CLUSTER_TAG_PREFIX}{cluster_name}")
}

/// A single key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered tag set as returned by the provider.
///
/// Lookups return the first matching key, so duplicate keys resolve the same
/// way the provider lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the first tag with `key`, or `None` if the key is
    /// missing or its value is empty.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Returns true if `key` is present with a non-empty value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns true if the resource carries the `do-not-delete` flag.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.has(DO_NOT_DELETE_TAG)
    }

    /// Returns true if the resource is owned by `cluster_name`.
    #[must_use]
    pub fn is_owned_by_cluster(&self, cluster_name: &str) -> bool {
        self.get(&cluster_tag(cluster_name)) == Some(CLUSTER_OWNED_VALUE)
    }

    /// Appends a tag.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(key, value));
    }

    /// Builder-style variant of [`TagSet::push`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Iterates tags in provider order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| Tag::new(k, v)).collect())
    }
}
