use std::sync::Arc;

use roster_types::{KeyOf, Keyed, ListId};

use crate::error::StoreResult;

/// Keyed item pool shared by several lists.
///
/// All implementations must satisfy these invariants:
/// - At most one value is stored per key.
/// - `store_insert` with `is_new == true` takes one hold for `holder`;
///   with `is_new == false` it only replaces the value.
/// - `store_remove` releases one hold of `holder`. The entry is evicted when
///   no holds remain, and never before.
/// - Every call is atomic with respect to concurrent callers.
pub trait SharedStore<T: Keyed>: Send + Sync {
    /// Write `item` under its key.
    ///
    /// `is_new` reports whether the calling list saw this key for the first
    /// time. A list that already holds the key passes `false`, which
    /// overwrites the stored value without taking another hold.
    fn store_insert(&self, item: T, is_new: bool, holder: ListId) -> StoreResult<()>;

    /// Release one hold of `holder` on `key`.
    ///
    /// Returns `true` if this release evicted the entry.
    fn store_remove(&self, key: &KeyOf<T>, holder: ListId) -> StoreResult<bool>;

    /// Look up the current value for `key`.
    fn store_query(&self, key: &KeyOf<T>) -> StoreResult<Option<Arc<T>>>;

    /// Check whether `key` is present in the store.
    fn contains(&self, key: &KeyOf<T>) -> StoreResult<bool> {
        Ok(self.store_query(key)?.is_some())
    }
}

/// An item type that can live in a shared store.
///
/// The associated `Store` names the pool type lists of this item share.
pub trait Shareable: Keyed + Send + Sync + Sized + 'static {
    type Store: SharedStore<Self>;
}
