//! Shared-store backend: keys locally, values in a [`SharedStore`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use roster_store::{Shareable, SharedStore, StoreError};
use roster_types::{KeyOf, ListId};
use tracing::warn;

use crate::error::{check_index, check_insert, check_range, ListError, ListResult};
use crate::traits::{count_new_keys, keyed_prefix_assignable, Backend, Inserted, KeyedBackend};

/// A list whose items physically live in a shared store.
///
/// The backend keeps only the key order and a key-to-position index; values
/// are written to and read from the store, which deduplicates identical keys
/// across every list using it. Each key this backend holds accounts for one
/// hold under its [`ListId`]. Holds are released when positions are erased,
/// on reset, and when the backend is dropped.
///
/// A store failure never leaves the key order and index disagreeing. Erase
/// and reset drop every position in range and report the first failed
/// release; an insert hands back the holds it already took before reporting
/// the failed write.
pub struct ShareBackend<T: Shareable> {
    order: Vec<KeyOf<T>>,
    index: HashMap<KeyOf<T>, usize>,
    store: Arc<T::Store>,
    holder: ListId,
}

impl<T: Shareable> ShareBackend<T> {
    /// Create an empty backend holding keys in `store` as `holder`.
    pub fn new(store: Arc<T::Store>, holder: ListId) -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
            store,
            holder,
        }
    }

    /// The store this backend reads through.
    pub fn store(&self) -> &Arc<T::Store> {
        &self.store
    }

    /// The identity this backend's holds are accounted under.
    pub fn holder(&self) -> ListId {
        self.holder
    }

    /// The keys in position order.
    pub fn keys(&self) -> &[KeyOf<T>] {
        &self.order
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, key) in self.order.iter().enumerate().skip(start) {
            self.index.insert(key.clone(), pos);
        }
    }

    fn release_all(&mut self) -> ListResult<()> {
        let mut failure = None;
        for key in self.order.drain(..) {
            if let Err(e) = self.store.store_remove(&key, self.holder) {
                failure.get_or_insert(e);
            }
        }
        self.index.clear();
        failure.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Give back holds on keys no longer in the order. Failures only leak a
    /// hold, so they are logged rather than reported.
    fn release_run(&self, run: &[KeyOf<T>]) {
        for key in run {
            if let Err(e) = self.store.store_remove(key, self.holder) {
                warn!(?key, holder = %self.holder.short_id(), error = %e, "failed to release shared key");
            }
        }
    }
}

impl<T: Shareable> fmt::Debug for ShareBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareBackend")
            .field("holder", &self.holder)
            .field("order", &self.order)
            .finish()
    }
}

impl<T: Shareable> Drop for ShareBackend<T> {
    fn drop(&mut self) {
        for key in &self.order {
            if let Err(e) = self.store.store_remove(key, self.holder) {
                warn!(?key, holder = %self.holder.short_id(), error = %e, "failed to release shared key");
            }
        }
    }
}

impl<T: Shareable> Backend for ShareBackend<T> {
    type Item = T;
    type Ref<'a>
        = Arc<T>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.order.len()
    }

    fn get(&self, index: usize) -> ListResult<Arc<T>> {
        check_index(index, self.order.len())?;
        let key = &self.order[index];
        self.store.store_query(key)?.ok_or_else(|| {
            StoreError::MissingEntry {
                key: format!("{key:?}"),
            }
            .into()
        })
    }

    fn set(&mut self, index: usize, value: T) -> ListResult<()> {
        check_index(index, self.order.len())?;
        let key = value.key();
        if key == self.order[index] {
            self.store.store_insert(value, false, self.holder)?;
            return Ok(());
        }
        if self.index.contains_key(&key) {
            return Err(ListError::ContractViolation {
                reason: format!("key {key:?} is already held by another position"),
            });
        }
        self.store.store_insert(value, true, self.holder)?;
        let old = std::mem::replace(&mut self.order[index], key.clone());
        self.index.remove(&old);
        self.index.insert(key, index);
        self.release_run(std::slice::from_ref(&old));
        Ok(())
    }

    fn insert_len(&self, items: &[T]) -> usize {
        count_new_keys(items, |key| self.index.contains_key(key))
    }

    fn insert_at(&mut self, index: usize, items: Vec<T>) -> ListResult<Inserted> {
        check_insert(index, self.order.len())?;
        let mut run: Vec<KeyOf<T>> = Vec::with_capacity(items.len());
        let mut fresh: HashSet<KeyOf<T>> = HashSet::new();
        let mut merged = Vec::new();
        for item in items {
            let key = item.key();
            let held = self.index.get(&key).copied();
            let is_new = held.is_none() && !fresh.contains(&key);
            if let Err(e) = self.store.store_insert(item, is_new, self.holder) {
                self.release_run(&run);
                return Err(e.into());
            }
            if let Some(pos) = held {
                merged.push(pos);
            } else if is_new {
                fresh.insert(key.clone());
                run.push(key);
            }
        }
        let count = run.len();
        let tail = self.order.split_off(index);
        self.order.extend(run);
        self.order.extend(tail);
        self.reindex_from(index);
        Ok(Inserted::with_merged(count, merged, index))
    }

    fn erase_range(&mut self, start: usize, end: usize) -> ListResult<()> {
        check_range(start, end, self.order.len())?;
        let mut failure = None;
        for key in self.order.drain(start..end) {
            if let Err(e) = self.store.store_remove(&key, self.holder) {
                failure.get_or_insert(e);
            }
            self.index.remove(&key);
        }
        self.reindex_from(start);
        failure.map_or(Ok(()), |e| Err(e.into()))
    }

    fn reset(&mut self) -> ListResult<()> {
        self.release_all()
    }

    fn prefix_assignable(&self, items: &[T]) -> bool {
        keyed_prefix_assignable(items, self.order.len(), |key| self.index.get(key).copied())
    }

    fn capacity(&self) -> usize {
        self.order.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.order.reserve(additional);
        self.index.reserve(additional);
    }
}

impl<T: Shareable> KeyedBackend for ShareBackend<T> {
    fn position_of(&self, key: &KeyOf<T>) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn key_at(&self, index: usize) -> ListResult<KeyOf<T>> {
        check_index(index, self.order.len())?;
        Ok(self.order[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_store::{InMemorySharedStore, StoreResult};
    use roster_types::Keyed;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Pair = (&'static str, i32);

    fn store() -> Arc<InMemorySharedStore<Pair>> {
        Arc::new(InMemorySharedStore::new())
    }

    fn values(b: &ShareBackend<Pair>) -> Vec<Pair> {
        b.iter().map(|r| *r.unwrap()).collect()
    }

    fn assert_mirrored(b: &ShareBackend<Pair>) {
        assert_eq!(b.index.len(), b.order.len());
        for (pos, key) in b.order.iter().enumerate() {
            assert_eq!(b.index.get(key), Some(&pos));
        }
    }

    // -----------------------------------------------------------------------
    // Local behaviour
    // -----------------------------------------------------------------------

    #[test]
    fn insert_and_read_through_store() {
        let shared = store();
        let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![("a", 1), ("c", 3)]).unwrap();
        b.insert_at(1, vec![("b", 2)]).unwrap();

        assert_eq!(values(&b), vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(b.position_of(&"c"), Some(2));
        assert_eq!(shared.len().unwrap(), 3);
        assert_mirrored(&b);
    }

    #[test]
    fn local_duplicate_is_merged_without_new_hold() {
        let shared = store();
        let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![("a", 1)]).unwrap();

        assert_eq!(b.insert_len(&[("a", 5)]), 0);
        let inserted = b.insert_at(1, vec![("a", 5)]).unwrap();
        assert_eq!(inserted.count, 0);
        assert_eq!(inserted.merged, vec![0]);
        assert_eq!(values(&b), vec![("a", 5)]);
        assert_eq!(shared.ref_count(&"a").unwrap(), 1);
    }

    #[test]
    fn erase_releases_holds_and_reindexes() {
        let shared = store();
        let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![("a", 1), ("b", 2), ("c", 3)]).unwrap();
        b.erase_range(0, 1).unwrap();

        assert!(!shared.contains(&"a").unwrap());
        assert_eq!(b.position_of(&"c"), Some(1));
        assert_mirrored(&b);
    }

    #[test]
    fn set_rekey_moves_hold() {
        let shared = store();
        let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![("a", 1), ("b", 2)]).unwrap();
        b.set(0, ("z", 26)).unwrap();

        assert!(!shared.contains(&"a").unwrap());
        assert_eq!(shared.ref_count(&"z").unwrap(), 1);
        assert_eq!(values(&b), vec![("z", 26), ("b", 2)]);
        assert!(matches!(
            b.set(0, ("b", 0)),
            Err(ListError::ContractViolation { .. })
        ));
        assert_mirrored(&b);
    }

    // -----------------------------------------------------------------------
    // Cross-list sharing
    // -----------------------------------------------------------------------

    #[test]
    fn two_lists_share_storage() {
        let shared = store();
        let mut left = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        let mut right = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        left.insert_at(0, vec![("a", 1), ("b", 2)]).unwrap();
        right.insert_at(0, vec![("b", 20)]).unwrap();

        assert_eq!(shared.len().unwrap(), 2);
        assert_eq!(shared.ref_count(&"b").unwrap(), 2);
        // One copy: the later write is visible through both lists.
        assert_eq!(*left.get(1).unwrap(), ("b", 20));
    }

    #[test]
    fn removing_shared_key_keeps_other_holder_intact() {
        let shared = store();
        let mut left = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        let mut right = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
        left.insert_at(0, vec![("a", 1)]).unwrap();
        right.insert_at(0, vec![("a", 1)]).unwrap();

        left.reset().unwrap();
        assert!(left.is_empty());
        assert_eq!(*right.get(0).unwrap(), ("a", 1));
        assert_eq!(shared.ref_count(&"a").unwrap(), 1);
    }

    #[test]
    fn drop_releases_holds() {
        let shared = store();
        {
            let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), ListId::new());
            b.insert_at(0, vec![("a", 1), ("b", 2)]).unwrap();
            assert_eq!(shared.len().unwrap(), 2);
        }
        assert!(shared.is_empty().unwrap());
    }

    #[test]
    fn evicted_entry_reports_missing() {
        let shared = store();
        let holder = ListId::new();
        let mut b = ShareBackend::<Pair>::new(Arc::clone(&shared), holder);
        b.insert_at(0, vec![("a", 1)]).unwrap();
        // Someone releases our hold behind our back.
        shared.store_remove(&"a", holder).unwrap();

        let err = b.get(0).unwrap_err();
        assert!(matches!(err, ListError::Store(StoreError::MissingEntry { .. })));
    }

    // -----------------------------------------------------------------------
    // Store failures
    // -----------------------------------------------------------------------

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Slot(&'static str, i32);

    impl Keyed for Slot {
        type Key = &'static str;

        fn key(&self) -> &'static str {
            self.0
        }
    }

    impl Shareable for Slot {
        type Store = RefusingStore;
    }

    /// Store that rejects every write and release of one key once armed.
    struct RefusingStore {
        inner: InMemorySharedStore<Slot>,
        refused: &'static str,
        armed: AtomicBool,
    }

    impl RefusingStore {
        fn new(refused: &'static str) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemorySharedStore::new(),
                refused,
                armed: AtomicBool::new(false),
            })
        }

        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }

        fn check(&self, key: &&'static str) -> StoreResult<()> {
            if self.armed.load(Ordering::SeqCst) && *key == self.refused {
                return Err(StoreError::Poisoned(format!("refused {key}")));
            }
            Ok(())
        }
    }

    impl SharedStore<Slot> for RefusingStore {
        fn store_insert(&self, item: Slot, is_new: bool, holder: ListId) -> StoreResult<()> {
            self.check(&item.0)?;
            self.inner.store_insert(item, is_new, holder)
        }

        fn store_remove(&self, key: &&'static str, holder: ListId) -> StoreResult<bool> {
            self.check(key)?;
            self.inner.store_remove(key, holder)
        }

        fn store_query(&self, key: &&'static str) -> StoreResult<Option<Arc<Slot>>> {
            self.inner.store_query(key)
        }
    }

    fn assert_cells_mirrored(b: &ShareBackend<Slot>) {
        assert_eq!(b.index.len(), b.order.len());
        for (pos, key) in b.order.iter().enumerate() {
            assert_eq!(b.index.get(key), Some(&pos));
        }
    }

    #[test]
    fn failed_release_still_drops_positions() {
        let shared = RefusingStore::new("b");
        let mut b = ShareBackend::<Slot>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![Slot("a", 1), Slot("b", 2), Slot("c", 3), Slot("d", 4)])
            .unwrap();
        shared.arm();

        let err = b.erase_range(0, 3).unwrap_err();
        assert!(matches!(err, ListError::Store(StoreError::Poisoned(_))));
        assert_eq!(b.keys(), &["d"]);
        assert_eq!(b.position_of(&"a"), None);
        assert_eq!(b.position_of(&"d"), Some(0));
        assert_eq!(*b.get(0).unwrap(), Slot("d", 4));
        assert!(!shared.inner.contains(&"a").unwrap());
        assert!(!shared.inner.contains(&"c").unwrap());
        assert_cells_mirrored(&b);
    }

    #[test]
    fn failed_write_returns_holds_taken_so_far() {
        let shared = RefusingStore::new("c");
        shared.arm();
        let mut b = ShareBackend::<Slot>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![Slot("x", 0)]).unwrap();

        let err = b
            .insert_at(0, vec![Slot("a", 1), Slot("b", 2), Slot("c", 3)])
            .unwrap_err();
        assert!(matches!(err, ListError::Store(StoreError::Poisoned(_))));
        assert_eq!(b.keys(), &["x"]);
        assert!(!shared.inner.contains(&"a").unwrap());
        assert!(!shared.inner.contains(&"b").unwrap());
        assert_eq!(shared.inner.len().unwrap(), 1);
        assert_cells_mirrored(&b);
    }

    #[test]
    fn failed_rekey_leaves_position_alone() {
        let shared = RefusingStore::new("z");
        shared.arm();
        let mut b = ShareBackend::<Slot>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![Slot("a", 1)]).unwrap();

        assert!(b.set(0, Slot("z", 26)).is_err());
        assert_eq!(b.keys(), &["a"]);
        assert_eq!(*b.get(0).unwrap(), Slot("a", 1));
        assert_eq!(shared.inner.ref_count(&"a").unwrap(), 1);
        assert_cells_mirrored(&b);
    }

    #[test]
    fn rekey_completes_when_old_release_fails() {
        let shared = RefusingStore::new("a");
        let mut b = ShareBackend::<Slot>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![Slot("a", 1)]).unwrap();
        shared.arm();

        b.set(0, Slot("b", 2)).unwrap();
        assert_eq!(b.keys(), &["b"]);
        assert_eq!(*b.get(0).unwrap(), Slot("b", 2));
        assert_cells_mirrored(&b);
    }

    #[test]
    fn failed_reset_still_clears() {
        let shared = RefusingStore::new("a");
        let mut b = ShareBackend::<Slot>::new(Arc::clone(&shared), ListId::new());
        b.insert_at(0, vec![Slot("a", 1), Slot("b", 2)]).unwrap();
        shared.arm();

        assert!(b.reset().is_err());
        assert!(b.is_empty());
        assert!(b.index.is_empty());
        assert!(!shared.inner.contains(&"b").unwrap());
    }
}
