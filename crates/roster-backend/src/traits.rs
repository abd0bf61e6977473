//! The [`Backend`] and [`KeyedBackend`] traits.
//!
//! Backends are selected statically: a list is generic over its backend, so
//! every call below is monomorphised and dispatched without a vtable.

use std::collections::HashSet;
use std::ops::Deref;

use roster_types::{KeyOf, Keyed};

use crate::error::ListResult;
use crate::iter::Iter;

/// Outcome of [`Backend::insert_at`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inserted {
    /// Number of new logical entries, placed at `index..index + count`.
    pub count: usize,
    /// Positions of pre-existing entries whose values were overwritten
    /// because an incoming item carried their key. Sorted, post-insertion.
    pub merged: Vec<usize>,
}

impl Inserted {
    /// An insertion with no merges.
    pub fn fresh(count: usize) -> Self {
        Self {
            count,
            merged: Vec::new(),
        }
    }

    /// Build from merged positions recorded before the new run was spliced
    /// in at `index`.
    pub(crate) fn with_merged(count: usize, mut merged: Vec<usize>, index: usize) -> Self {
        for pos in merged.iter_mut() {
            if *pos >= index {
                *pos += count;
            }
        }
        merged.sort_unstable();
        merged.dedup();
        Self { count, merged }
    }
}

/// Ordered item storage with positional access.
///
/// Mutators validate bounds before touching any state, so a failed call
/// leaves the backend unchanged.
pub trait Backend {
    /// The stored item type.
    type Item;

    /// Borrowed view of one item. Plain references for backends that own
    /// their items, shared handles for backends that read through a store.
    type Ref<'a>: Deref<Target = Self::Item>
    where
        Self: 'a;

    /// Number of logical positions.
    fn len(&self) -> usize;

    /// Returns `true` if there are no positions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `index`. Fails with `OutOfRange` past the end.
    fn get(&self, index: usize) -> ListResult<Self::Ref<'_>>;

    /// Overwrite the item at `index` in place.
    ///
    /// Keyed backends accept a different key only if no other position
    /// already holds it.
    fn set(&mut self, index: usize, value: Self::Item) -> ListResult<()>;

    /// How many new logical entries inserting `items` would add.
    ///
    /// Keyed backends count distinct keys not yet present; the plain vector
    /// counts every item.
    fn insert_len(&self, items: &[Self::Item]) -> usize;

    /// Insert `items` before position `index` (`0..=len`).
    ///
    /// The reported `count` always equals [`Backend::insert_len`] evaluated on
    /// the same items just before the call.
    fn insert_at(&mut self, index: usize, items: Vec<Self::Item>) -> ListResult<Inserted>;

    /// Remove positions `start..end`.
    fn erase_range(&mut self, start: usize, end: usize) -> ListResult<()>;

    /// Remove everything.
    fn reset(&mut self) -> ListResult<()>;

    /// Remove everything, then insert `items`.
    fn reset_with(&mut self, items: Vec<Self::Item>) -> ListResult<Inserted> {
        self.reset()?;
        self.insert_at(0, items)
    }

    /// Whether `items` can overwrite positions `0..min(len, items.len())`
    /// one by one, followed by appending the rest, without two positions
    /// ever sharing a key.
    fn prefix_assignable(&self, items: &[Self::Item]) -> bool {
        let _ = items;
        true
    }

    /// Positions the backend can hold without reallocating.
    fn capacity(&self) -> usize;

    /// Reserve room for at least `additional` more positions.
    fn reserve(&mut self, additional: usize);

    /// Lazy, restartable traversal in position order.
    fn iter(&self) -> Iter<'_, Self>
    where
        Self: Sized,
    {
        Iter::new(self)
    }
}

/// A backend whose items carry keys.
pub trait KeyedBackend: Backend
where
    Self::Item: Keyed,
{
    /// The position holding `key`, if any.
    fn position_of(&self, key: &KeyOf<Self::Item>) -> Option<usize>;

    /// The key at `index`.
    fn key_at(&self, index: usize) -> ListResult<KeyOf<Self::Item>>;

    /// Returns `true` if some position holds `key`.
    fn contains_key(&self, key: &KeyOf<Self::Item>) -> bool {
        self.position_of(key).is_some()
    }

    /// The item stored under `key`, if any.
    fn value_of(&self, key: &KeyOf<Self::Item>) -> ListResult<Option<Self::Ref<'_>>> {
        match self.position_of(key) {
            Some(pos) => self.get(pos).map(Some),
            None => Ok(None),
        }
    }
}

/// Shared check behind the keyed backends' [`Backend::prefix_assignable`].
///
/// Overwriting position `i` with key `k` is safe only if `k` is not held by
/// a later position that has not been overwritten yet. Incoming keys must
/// also be distinct.
pub(crate) fn keyed_prefix_assignable<T, F>(items: &[T], len: usize, position_of: F) -> bool
where
    T: Keyed,
    F: Fn(&KeyOf<T>) -> Option<usize>,
{
    let mut seen = HashSet::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let key = item.key();
        if i < len {
            if let Some(pos) = position_of(&key) {
                if pos > i {
                    return false;
                }
            }
        }
        if !seen.insert(key) {
            return false;
        }
    }
    true
}

/// Number of distinct keys in `items` for which `present` is false.
pub(crate) fn count_new_keys<T, F>(items: &[T], present: F) -> usize
where
    T: Keyed,
    F: Fn(&KeyOf<T>) -> bool,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| {
            let key = item.key();
            !present(&key) && seen.insert(key)
        })
        .count()
}
