//! The key trait: how an item names itself.

use std::fmt::Debug;
use std::hash::Hash;

/// Per-item-type identity policy.
///
/// `key` must be pure and deterministic, and the key of an item must not
/// change while the item is stored in a keyed list. Mutating an item's key in
/// place after insertion desynchronises the list's index; keeping keys stable
/// is the caller's responsibility.
///
/// Two items with equal keys are the same logical entity for deduplication
/// and reconciliation.
pub trait Keyed {
    /// The identity type. Hashable so keyed backends can index it.
    type Key: Clone + Eq + Hash + Debug;

    /// Derive the key of this item.
    fn key(&self) -> Self::Key;
}

/// The key type of a [`Keyed`] item.
pub type KeyOf<T> = <T as Keyed>::Key;

/// Pairs are keyed by their first element.
impl<K, V> Keyed for (K, V)
where
    K: Clone + Eq + Hash + Debug,
{
    type Key = K;

    fn key(&self) -> K {
        self.0.clone()
    }
}
