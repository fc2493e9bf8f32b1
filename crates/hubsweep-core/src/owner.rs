//! Owner keys and username resolution.
//!
//! Every user volume is created for a persistent volume claim named
//! `claim-<escaped username>`. The claim name is copied onto the volume and
//! all of its snapshots, so it is the stable key linking a user to their
//! storage. The username part is escaped with `-` as the escape character:
//! every byte outside the safe set is written as `-XX` (two hex digits).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of owner keys that belong to a user claim.
pub const USER_CLAIM_PREFIX: &str = "claim-";

/// Owner key of the hub database volume.
pub const HUB_DATABASE_OWNER_KEY: &str = "hub-db-dir";

const ESCAPE_CHAR: u8 = b'-';

/// Errors resolving an owner key to a username.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnerKeyError {
    /// The key does not name a user claim.
    #[error("owner key '{0}' does not start with '{USER_CLAIM_PREFIX}'")]
    NotUserClaim(String),

    /// The escaped username decodes to invalid UTF-8.
    #[error("owner key '{0}' could not be unescaped")]
    Unescape(String),
}

/// Stable identifier linking a volume to its snapshots and to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Wraps a raw owner key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the username the claim was created for.
    ///
    /// # Errors
    ///
    /// Returns [`OwnerKeyError::NotUserClaim`] for keys that are not user
    /// claims (e.g. the hub database) and [`OwnerKeyError::Unescape`] if the
    /// escaped part does not decode to UTF-8.
    pub fn username(&self) -> Result<String, OwnerKeyError> {
        let escaped = self
            .0
            .strip_prefix(USER_CLAIM_PREFIX)
            .ok_or_else(|| OwnerKeyError::NotUserClaim(self.0.clone()))?;
        unescape(escaped).ok_or_else(|| OwnerKeyError::Unescape(self.0.clone()))
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Decodes `-XX` escapes.
///
/// A `-` followed by two ASCII alphanumerics is an escape and must be hex;
/// any other `-` is kept as is.
fn unescape(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == ESCAPE_CHAR
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_alphanumeric()
            && bytes[i + 2].is_ascii_alphanumeric()
        {
            let hi = hex_value(bytes[i + 1])?;
            let lo = hex_value(bytes[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decides which owner keys are never candidates for automatic deletion.
///
/// The hub database volume is the canonical example; deployments can add
/// others through configuration.
pub trait OwnerKeyPolicy: Send + Sync {
    /// Returns true if resources with this owner key must never be touched.
    fn is_protected(&self, key: &OwnerKey) -> bool;
}

/// Policy backed by an explicit list of protected keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedOwnerKeys {
    keys: Vec<OwnerKey>,
}

impl ProtectedOwnerKeys {
    /// Creates a policy protecting exactly `keys`.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(OwnerKey::new).collect(),
        }
    }
}

impl Default for ProtectedOwnerKeys {
    fn default() -> Self {
        Self::new([HUB_DATABASE_OWNER_KEY])
    }
}

impl OwnerKeyPolicy for ProtectedOwnerKeys {
    fn is_protected(&self, key: &OwnerKey) -> bool {
        self.keys.contains(key)
    }
}
