//! The observable list.

use std::ops::Range;
use std::sync::Arc;

use roster_backend::{
    Backend, Iter, KeyedBackend, ListError, ListResult, MapBackend, ShareBackend, VecBackend,
    VecMapBackend,
};
use roster_store::Shareable;
use roster_types::{ChangeEvent, KeyOf, Keyed, ListId};
use tracing::{debug, warn};

use crate::config::ListConfig;
use crate::notify::{ChangeObserver, EventStream, Notifier};

/// Callback run for every physically inserted entry, after insertion and
/// before the closing end-insert event.
pub type InsertHook<T> = Box<dyn FnMut(usize, &T) + Send>;

/// A list backed by a plain vector.
pub type VecList<T> = RosterList<VecBackend<T>>;
/// A list backed by a vector with a key index.
pub type VecMapList<T> = RosterList<VecMapBackend<T>>;
/// A list backed by a key-to-value map plus a key order.
pub type MapList<T> = RosterList<MapBackend<T>>;
/// A list whose values live in a store shared with other lists.
pub type ShareList<T> = RosterList<ShareBackend<T>>;

/// An ordered sequence of items that announces every structural change.
///
/// Each mutation is bracketed: observers see a begin-event describing the
/// affected range, the backend is mutated, then the matching end-event
/// follows. Value updates that keep the length produce a single
/// [`ChangeEvent::Changed`]. Bounds are validated before any event is
/// emitted, so a rejected call leaves both the list and its observers
/// untouched.
pub struct RosterList<B: Backend> {
    backend: B,
    id: ListId,
    notifier: Notifier,
    insert_hook: Option<InsertHook<B::Item>>,
    has_more: bool,
    config: ListConfig,
}

impl<B: Backend + Default> RosterList<B> {
    pub fn new() -> Self {
        Self::with_config(ListConfig::default())
    }

    pub fn with_config(config: ListConfig) -> Self {
        Self::from_backend(B::default(), config)
    }
}

impl<B: Backend + Default> Default for RosterList<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Shareable> RosterList<ShareBackend<T>> {
    /// Create a list whose values are held in `store`. The list's own id is
    /// used as its holder identity in the store.
    pub fn shared(store: Arc<T::Store>, config: ListConfig) -> Self {
        let id = ListId::new();
        Self::with_parts(ShareBackend::new(store, id), id, config)
    }
}

impl<B: Backend> RosterList<B> {
    /// Wrap an existing backend. Items already in it are not announced.
    pub fn from_backend(backend: B, config: ListConfig) -> Self {
        Self::with_parts(backend, ListId::new(), config)
    }

    fn with_parts(mut backend: B, id: ListId, config: ListConfig) -> Self {
        backend.reserve(config.capacity);
        Self {
            backend,
            id,
            notifier: Notifier::new(config.event_capacity),
            insert_hook: None,
            has_more: config.has_more,
            config,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // -----------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------

    /// Open a broadcast subscription to this list's events.
    pub fn subscribe(&self) -> EventStream {
        self.notifier.subscribe()
    }

    /// Register a synchronous observer.
    pub fn observe(&mut self, observer: impl ChangeObserver + 'static) {
        self.notifier.observe(Box::new(observer));
    }

    /// Install the per-entry insertion hook, replacing any previous one.
    pub fn set_insert_hook(&mut self, hook: impl FnMut(usize, &B::Item) + Send + 'static) {
        self.insert_hook = Some(Box::new(hook));
    }

    pub fn clear_insert_hook(&mut self) {
        self.insert_hook = None;
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.backend.capacity()
    }

    /// The item at `index`, or [`ListError::OutOfRange`].
    pub fn at(&self, index: usize) -> ListResult<B::Ref<'_>> {
        self.backend.get(index)
    }

    /// The item at `index`, or `None` when out of range.
    pub fn item(&self, index: usize) -> Option<B::Ref<'_>> {
        self.backend.get(index).ok()
    }

    /// Up to `count` items starting at `offset`; all remaining items when
    /// `count` is `None`. The window is clamped to the list.
    pub fn items(&self, offset: usize, count: Option<usize>) -> ListResult<Vec<B::Ref<'_>>> {
        let len = self.backend.len();
        let start = offset.min(len);
        let end = match count {
            Some(count) => start.saturating_add(count).min(len),
            None => len,
        };
        (start..end).map(|i| self.backend.get(i)).collect()
    }

    pub fn iter(&self) -> Iter<'_, B> {
        self.backend.iter()
    }

    /// Clone every item out, in order.
    pub fn to_vec(&self) -> ListResult<Vec<B::Item>>
    where
        B::Item: Clone,
    {
        self.iter().map(|r| r.map(|item| (*item).clone())).collect()
    }

    // -----------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------

    /// Insert `items` at `pos` and return the number of positions added.
    ///
    /// On keyed backends an item whose key is already present overwrites
    /// the existing entry in place; those positions are announced with
    /// [`ChangeEvent::Changed`] after the insert bracket closes.
    pub fn insert(&mut self, pos: usize, items: Vec<B::Item>) -> ListResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let len = self.backend.len();
        if pos > len {
            return Err(ListError::OutOfRange { index: pos, len });
        }

        let count = self.backend.insert_len(&items);
        if count > 0 {
            self.notifier.emit(ChangeEvent::begin_insert(pos..pos + count));
        }
        let inserted = match self.backend.insert_at(pos, items) {
            Ok(inserted) => inserted,
            Err(e) => {
                if count > 0 {
                    self.notifier.emit(ChangeEvent::EndInsert);
                }
                self.resync(&e);
                return Err(e);
            }
        };
        let hooked = self.run_insert_hook(pos..pos + inserted.count);
        if count > 0 {
            self.notifier.emit(ChangeEvent::EndInsert);
        }
        hooked?;
        debug_assert_eq!(inserted.count, count);

        self.emit_changed_runs(&inserted.merged);
        debug!(
            list = %self.id.short_id(),
            pos,
            inserted = inserted.count,
            merged = inserted.merged.len(),
            "insert"
        );
        Ok(inserted.count)
    }

    pub fn insert_one(&mut self, pos: usize, item: B::Item) -> ListResult<usize> {
        self.insert(pos, vec![item])
    }

    /// Append `item` at the end.
    pub fn push(&mut self, item: B::Item) -> ListResult<usize> {
        let end = self.backend.len();
        self.insert(end, vec![item])
    }

    // -----------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------

    pub fn remove(&mut self, pos: usize) -> ListResult<()> {
        self.remove_range(pos, 1)
    }

    /// Remove `count` items starting at `pos`. A zero count is a no-op.
    ///
    /// If the backend reports a failure after the range was announced, the
    /// positions are gone all the same and the error is passed on.
    pub fn remove_range(&mut self, pos: usize, count: usize) -> ListResult<()> {
        if count == 0 {
            return Ok(());
        }
        let len = self.backend.len();
        if pos >= len {
            return Err(ListError::OutOfRange { index: pos, len });
        }
        let end = pos.checked_add(count).filter(|end| *end <= len).ok_or(
            ListError::RangeOutOfBounds {
                start: pos,
                end: pos.saturating_add(count),
                len,
            },
        )?;

        self.notifier.emit(ChangeEvent::begin_remove(pos..end));
        let result = self.backend.erase_range(pos, end);
        self.notifier.emit(ChangeEvent::EndRemove);
        result?;

        debug!(list = %self.id.short_id(), pos, count, "remove");
        Ok(())
    }

    /// Remove every item matching `pred` and return how many were removed.
    /// Each removal is bracketed separately, from the back of the list.
    pub fn remove_if(&mut self, mut pred: impl FnMut(&B::Item) -> bool) -> ListResult<usize> {
        let mut doomed = Vec::new();
        for index in 0..self.backend.len() {
            let item = self.backend.get(index)?;
            if pred(&*item) {
                doomed.push(index);
            }
        }
        for &index in doomed.iter().rev() {
            self.remove(index)?;
        }
        Ok(doomed.len())
    }

    // -----------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------

    /// Overwrite the item at `pos`.
    pub fn replace(&mut self, pos: usize, value: B::Item) -> ListResult<()> {
        self.backend.set(pos, value)?;
        self.notifier.emit(ChangeEvent::changed(pos..pos + 1));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------

    /// Remove every item inside a single reset bracket.
    pub fn reset(&mut self) -> ListResult<()> {
        self.notifier.emit(ChangeEvent::BeginReset);
        let result = self.backend.reset();
        self.notifier.emit(ChangeEvent::EndReset);
        result?;
        debug!(list = %self.id.short_id(), "reset");
        Ok(())
    }

    /// Replace the whole contents with `items` inside a single reset
    /// bracket. Returns the resulting length.
    pub fn reset_items(&mut self, items: Vec<B::Item>) -> ListResult<usize> {
        self.notifier.emit(ChangeEvent::BeginReset);
        let result = match self.backend.reset_with(items) {
            Ok(inserted) => self.run_insert_hook(0..inserted.count).map(|_| inserted.count),
            Err(e) => Err(e),
        };
        self.notifier.emit(ChangeEvent::EndReset);
        let count = result?;
        debug!(list = %self.id.short_id(), count, "reset");
        Ok(count)
    }

    /// Reset to `items` when given, or to empty otherwise.
    pub fn reset_with(&mut self, items: Option<Vec<B::Item>>) -> ListResult<usize> {
        match items {
            Some(items) => self.reset_items(items),
            None => self.reset().map(|_| 0),
        }
    }

    /// Make the list equal to `items` with the fewest structural events:
    /// the shared prefix is overwritten and announced as one change, then
    /// the tail is inserted or the excess removed.
    ///
    /// When overwriting the prefix in place would make two positions share
    /// a key, the call degrades to a full reset.
    pub fn replace_reset(&mut self, items: Vec<B::Item>) -> ListResult<()> {
        let old = self.backend.len();
        let new = items.len();
        if !self.backend.prefix_assignable(&items) {
            warn!(
                list = %self.id.short_id(),
                old,
                new,
                "in-place overwrite would collide keys, resetting instead"
            );
            return self.reset_items(items).map(|_| ());
        }

        let num = old.min(new);
        let mut prefix = items;
        let tail = prefix.split_off(num);

        let mut written = 0;
        let mut failure = None;
        for item in prefix {
            if let Err(e) = self.backend.set(written, item) {
                failure = Some(e);
                break;
            }
            written += 1;
        }
        if written > 0 {
            self.notifier.emit(ChangeEvent::changed(0..written));
        }
        if let Some(e) = failure {
            return Err(e);
        }

        if new > old {
            self.insert(num, tail)?;
        } else if new < old {
            self.remove_range(new, old - new)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Paging
    // -----------------------------------------------------------------

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Update the paging flag; observers hear about it only when it flips.
    pub fn set_has_more(&mut self, has_more: bool) {
        if self.has_more != has_more {
            self.has_more = has_more;
            self.notifier.emit(ChangeEvent::HasMoreChanged { has_more });
        }
    }

    pub fn can_fetch_more(&self) -> bool {
        self.has_more
    }

    /// Ask whoever feeds this list for the next batch. Returns `false`
    /// without emitting anything when no more rows are expected.
    pub fn fetch_more(&mut self) -> bool {
        if !self.has_more {
            return false;
        }
        let loaded = self.backend.len();
        let batch = self.config.fetch_batch;
        debug!(list = %self.id.short_id(), loaded, batch, "fetch more");
        self.notifier
            .emit(ChangeEvent::FetchMoreRequested { loaded, batch });
        true
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn run_insert_hook(&mut self, range: Range<usize>) -> ListResult<()> {
        if let Some(hook) = self.insert_hook.as_mut() {
            for index in range {
                let item = self.backend.get(index)?;
                hook(index, &*item);
            }
        }
        Ok(())
    }

    /// Tell observers to re-read everything after the backend refused an
    /// insert it had already been announced for.
    fn resync(&mut self, error: &ListError) {
        warn!(list = %self.id.short_id(), %error, "insert failed, resyncing observers");
        self.notifier.emit(ChangeEvent::BeginReset);
        self.notifier.emit(ChangeEvent::EndReset);
    }

    /// Announce sorted positions as contiguous `Changed` ranges.
    fn emit_changed_runs(&mut self, positions: &[usize]) {
        let mut iter = positions.iter().copied();
        let Some(first) = iter.next() else {
            return;
        };
        let mut run = first..first + 1;
        for pos in iter {
            if pos == run.end {
                run.end += 1;
            } else {
                self.notifier.emit(ChangeEvent::changed(run.clone()));
                run = pos..pos + 1;
            }
        }
        self.notifier.emit(ChangeEvent::changed(run));
    }
}

impl<B> RosterList<B>
where
    B: KeyedBackend,
    B::Item: Keyed,
{
    pub fn contains_key(&self, key: &KeyOf<B::Item>) -> bool {
        self.backend.contains_key(key)
    }

    pub fn position_of(&self, key: &KeyOf<B::Item>) -> Option<usize> {
        self.backend.position_of(key)
    }

    pub fn key_at(&self, index: usize) -> ListResult<KeyOf<B::Item>> {
        self.backend.key_at(index)
    }

    pub fn value_of(&self, key: &KeyOf<B::Item>) -> ListResult<Option<B::Ref<'_>>> {
        self.backend.value_of(key)
    }
}

impl<T: PartialEq> RosterList<VecBackend<T>> {
    /// Position of the first item equal to `value`.
    pub fn find(&self, value: &T) -> Option<usize> {
        self.backend.find(value)
    }
}

impl<B: Backend> std::fmt::Debug for RosterList<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterList")
            .field("id", &self.id)
            .field("len", &self.backend.len())
            .field("has_more", &self.has_more)
            .field("notifier", &self.notifier)
            .finish()
    }
}
