//! Keyed reconciliation of a list against an incoming batch.
//!
//! Both operations classify the current positions by key against the
//! incoming items:
//!
//! | Current key | In incoming? | `sync` | `extend` |
//! |---|---|---|---|
//! | yes | yes | replaced in place | replaced in place |
//! | yes | no | removed | kept |
//! | no | yes | inserted at its incoming index | appended |
//!
//! When the incoming batch repeats a key, its last occurrence wins.

use std::collections::{BTreeSet, HashMap};

use roster_backend::{KeyedBackend, ListResult};
use roster_types::{KeyOf, Keyed};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::list::RosterList;

/// What a [`RosterList::sync`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub updated: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl SyncSummary {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.inserted == 0
    }
}

/// Incoming items by key, plus the taken-out slots they point into.
struct Incoming<T: Keyed> {
    slots: Vec<Option<T>>,
    wanted: HashMap<KeyOf<T>, usize>,
}

impl<T: Keyed> Incoming<T> {
    fn new(items: Vec<T>) -> Self {
        let mut wanted = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            wanted.insert(item.key(), index);
        }
        Self {
            slots: items.into_iter().map(Some).collect(),
            wanted,
        }
    }

    /// Claim the incoming item for `key`, if any.
    fn claim(&mut self, key: &KeyOf<T>) -> Option<T> {
        let index = self.wanted.remove(key)?;
        self.slots[index].take()
    }

    /// Unclaimed items with their incoming indices, in ascending order.
    fn into_unclaimed(mut self) -> Vec<(usize, T)> {
        let order: BTreeSet<usize> = self.wanted.into_values().collect();
        order
            .into_iter()
            .filter_map(|index| self.slots[index].take().map(|item| (index, item)))
            .collect()
    }
}

impl<B> RosterList<B>
where
    B: KeyedBackend,
    B::Item: Keyed,
{
    /// Make the list hold exactly the keys of `items`.
    ///
    /// Entries whose key is absent from `items` are removed, entries whose
    /// key is present take the incoming value, and new keys are inserted at
    /// their incoming index (clamped to the current length). Entries that
    /// survive keep their relative order.
    pub fn sync(&mut self, items: Vec<B::Item>) -> ListResult<SyncSummary> {
        let mut incoming = Incoming::new(items);
        let mut summary = SyncSummary::default();

        let mut pos = 0;
        while pos < self.len() {
            let key = self.key_at(pos)?;
            match incoming.claim(&key) {
                Some(item) => {
                    trace!(?key, pos, "sync: update");
                    self.replace(pos, item)?;
                    summary.updated += 1;
                    pos += 1;
                }
                None => {
                    trace!(?key, pos, "sync: drop");
                    self.remove(pos)?;
                    summary.removed += 1;
                }
            }
        }

        for (src, item) in incoming.into_unclaimed() {
            let at = src.min(self.len());
            trace!(src, at, "sync: insert");
            summary.inserted += self.insert(at, vec![item])?;
        }

        debug!(
            list = %self.id().short_id(),
            updated = summary.updated,
            removed = summary.removed,
            inserted = summary.inserted,
            "sync"
        );
        Ok(summary)
    }

    /// Merge `items` into the list without removing anything. Known keys
    /// take the incoming value in place; new keys are appended in incoming
    /// order. Returns the number of appended entries.
    pub fn extend(&mut self, items: Vec<B::Item>) -> ListResult<usize> {
        let mut incoming = Incoming::new(items);
        let mut updated = 0;

        for pos in 0..self.len() {
            let key = self.key_at(pos)?;
            if let Some(item) = incoming.claim(&key) {
                trace!(?key, pos, "extend: update");
                self.replace(pos, item)?;
                updated += 1;
            }
        }

        let mut appended = 0;
        for (_, item) in incoming.into_unclaimed() {
            appended += self.push(item)?;
        }

        debug!(list = %self.id().short_id(), updated, appended, "extend");
        Ok(appended)
    }
}
