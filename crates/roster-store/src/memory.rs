use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use roster_types::{KeyOf, Keyed, ListId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Shareable, SharedStore};

/// One stored item and the lists holding it.
struct Entry<T> {
    value: Arc<T>,
    holds: HashMap<ListId, usize>,
}

impl<T> Entry<T> {
    fn ref_count(&self) -> usize {
        self.holds.values().sum()
    }
}

/// In-memory, HashMap-based shared store.
///
/// All entries are held behind a `RwLock` for safe concurrent access. Values
/// are stored as `Arc<T>` so lookups hand out cheap shared references that
/// stay valid even if the entry is replaced or evicted afterwards.
pub struct InMemorySharedStore<T: Keyed> {
    entries: RwLock<HashMap<KeyOf<T>, Entry<T>>>,
}

impl<T: Keyed> InMemorySharedStore<T> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<KeyOf<T>, Entry<T>>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<KeyOf<T>, Entry<T>>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Number of distinct keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Total holds on `key` across all lists. Zero if the key is absent.
    pub fn ref_count(&self, key: &KeyOf<T>) -> StoreResult<usize> {
        Ok(self.read()?.get(key).map(Entry::ref_count).unwrap_or(0))
    }

    /// The lists currently holding `key`, sorted.
    pub fn holders(&self, key: &KeyOf<T>) -> StoreResult<Vec<ListId>> {
        let map = self.read()?;
        let mut ids: Vec<ListId> = map
            .get(key)
            .map(|entry| entry.holds.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }
}

impl<T: Keyed> Default for InMemorySharedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedStore<T> for InMemorySharedStore<T>
where
    T: Keyed + Send + Sync,
    KeyOf<T>: Send + Sync,
{
    fn store_insert(&self, item: T, is_new: bool, holder: ListId) -> StoreResult<()> {
        let key = item.key();
        let mut map = self.write()?;
        let value = Arc::new(item);
        match map.get_mut(&key) {
            Some(entry) => {
                entry.value = value;
                if is_new || !entry.holds.contains_key(&holder) {
                    *entry.holds.entry(holder).or_insert(0) += 1;
                }
            }
            None => {
                // A key unknown to the store always starts with the caller's
                // hold, whatever the caller believed about it.
                let mut holds = HashMap::new();
                holds.insert(holder, 1);
                map.insert(key, Entry { value, holds });
            }
        }
        Ok(())
    }

    fn store_remove(&self, key: &KeyOf<T>, holder: ListId) -> StoreResult<bool> {
        let mut map = self.write()?;
        let Some(entry) = map.get_mut(key) else {
            return Ok(false);
        };
        if let Some(count) = entry.holds.get_mut(&holder) {
            *count -= 1;
            if *count == 0 {
                entry.holds.remove(&holder);
            }
        }
        if entry.holds.is_empty() {
            map.remove(key);
            debug!(?key, holder = %holder.short_id(), "evicted shared entry");
            return Ok(true);
        }
        Ok(false)
    }

    fn store_query(&self, key: &KeyOf<T>) -> StoreResult<Option<Arc<T>>> {
        Ok(self.read()?.get(key).map(|entry| Arc::clone(&entry.value)))
    }
}

impl<T: Keyed> std::fmt::Debug for InMemorySharedStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|map| map.len()).unwrap_or(0);
        f.debug_struct("InMemorySharedStore")
            .field("entry_count", &count)
            .finish()
    }
}

/// Pairs share an in-memory store keyed by their first element.
impl<K, V> Shareable for (K, V)
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Store = InMemorySharedStore<(K, V)>;
}
