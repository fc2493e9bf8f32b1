//! Snapshot deduplication.
//!
//! A user should have at most one snapshot. Eligible snapshots are grouped
//! by owner key; within each group the newest by start time survives and
//! the rest are duplicates. Ties keep provider order.

use std::collections::HashMap;

use hubsweep_core::{CloudSnapshot, OwnerKey, OwnerKeyPolicy};

use crate::report::Skip;

/// Output of [`Deduplicator::reduce`].
#[derive(Debug, Default)]
pub struct Deduplicated {
    /// Newest snapshot per owner, in first-seen owner order.
    pub survivors: Vec<CloudSnapshot>,
    /// Older snapshots of owners that have a survivor.
    pub duplicates: Vec<CloudSnapshot>,
    /// Snapshots that take no part in deduplication or evaluation.
    pub excluded: Vec<(CloudSnapshot, Skip)>,
}

/// Reduces a snapshot listing to one snapshot per owner.
pub struct Deduplicator<'a> {
    policy: &'a dyn OwnerKeyPolicy,
}

impl<'a> Deduplicator<'a> {
    /// Creates a deduplicator honoring `policy`.
    #[must_use]
    pub fn new(policy: &'a dyn OwnerKeyPolicy) -> Self {
        Self { policy }
    }

    /// Partitions `snapshots` into survivors, duplicates and exclusions.
    ///
    /// Snapshots with a protected owner key, a `do-not-delete` tag or no
    /// start time are excluded and never become duplicates.
    #[must_use]
    pub fn reduce(&self, snapshots: Vec<CloudSnapshot>) -> Deduplicated {
        let mut out = Deduplicated::default();
        let mut order: Vec<OwnerKey> = Vec::new();
        let mut groups: HashMap<OwnerKey, Vec<CloudSnapshot>> = HashMap::new();

        for snapshot in snapshots {
            let Some(owner) = snapshot.owner_key() else {
                out.excluded.push((snapshot, Skip::MissingOwnerKey));
                continue;
            };
            if self.policy.is_protected(&owner) {
                out.excluded.push((snapshot, Skip::ProtectedOwner));
                continue;
            }
            if snapshot.is_protected() {
                out.excluded.push((snapshot, Skip::DoNotDelete));
                continue;
            }
            if snapshot.start_time.is_none() {
                out.excluded.push((snapshot, Skip::MissingStartTime));
                continue;
            }
            groups
                .entry(owner.clone())
                .or_insert_with(|| {
                    order.push(owner);
                    Vec::new()
                })
                .push(snapshot);
        }

        for owner in order {
            let Some(mut group) = groups.remove(&owner) else {
                continue;
            };
            // Stable: equal start times keep provider order.
            group.sort_by(|a, b| b.start_time.cmp(&a.start_time));
            let mut group = group.into_iter();
            if let Some(newest) = group.next() {
                out.survivors.push(newest);
            }
            out.duplicates.extend(group);
        }
        out
    }
}
