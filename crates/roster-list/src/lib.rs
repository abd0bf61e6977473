//! # roster-list
//!
//! Observable, ordered lists of items with optional key indexing.
//!
//! A [`RosterList`] wraps a storage backend from `roster-backend` and turns
//! every mutation into a bracketed sequence of [`ChangeEvent`]s, so views
//! built on top can mirror the list incrementally. Keyed lists additionally
//! support [`sync`](RosterList::sync) and [`extend`](RosterList::extend),
//! which reconcile the list against a fresh batch from upstream with the
//! fewest structural changes.
//!
//! # Example
//!
//! ```
//! use roster_list::{ChangeEvent, RosterList, VecMapList};
//!
//! let mut list: VecMapList<(&str, i32)> = RosterList::new();
//! let mut events = list.subscribe();
//!
//! list.insert(0, vec![("a", 1), ("b", 2), ("c", 3)]).unwrap();
//! list.sync(vec![("b", 20), ("c", 3), ("d", 4)]).unwrap();
//!
//! assert_eq!(list.to_vec().unwrap(), vec![("b", 20), ("c", 3), ("d", 4)]);
//! assert_eq!(events.try_recv().unwrap(), ChangeEvent::begin_insert(0..3));
//! ```
//!
//! # Design Rules
//!
//! 1. Bounds are checked before the first event; a rejected call emits
//!    nothing and changes nothing.
//! 2. Begin and end events always come in pairs and never nest.
//! 3. Events report half-open position ranges.

pub mod config;
pub mod list;
pub mod notify;
pub mod reconcile;

pub use config::ListConfig;
pub use list::{InsertHook, MapList, RosterList, ShareList, VecList, VecMapList};
pub use notify::{ChangeObserver, EventStream, Notifier};
pub use reconcile::SyncSummary;

pub use roster_backend::{
    Backend, KeyedBackend, ListError, ListResult, MapBackend, ShareBackend, VecBackend,
    VecMapBackend,
};
pub use roster_store::{InMemorySharedStore, Shareable, SharedStore, StoreError};
pub use roster_types::{ChangeEvent, ChangeKind, KeyOf, Keyed, ListId};
