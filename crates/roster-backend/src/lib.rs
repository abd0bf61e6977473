//! Storage backends for roster lists.
//!
//! A backend owns the ordered sequence of items plus whatever index it needs
//! for key lookups. Backends know nothing about change notifications; the
//! list layer brackets every call it makes into them.
//!
//! # Backends
//!
//! All backends implement the [`Backend`] trait; the keyed ones (and
//! [`VecBackend`] for keyed items, by linear scan) also implement
//! [`KeyedBackend`]:
//!
//! | Backend | Key lookup | Position lookup | Duplicate keys |
//! |---|---|---|---|
//! | [`VecBackend`] | O(n) scan | O(1) | kept as-is |
//! | [`VecMapBackend`] | O(1) | O(1) | merged on insert |
//! | [`MapBackend`] | O(1) value, O(n) position | O(1) via order | merged on insert |
//! | [`ShareBackend`] | O(1) | O(1) + store lookup | merged locally, deduplicated across lists by the store |
//!
//! # Design Rules
//!
//! 1. Bounds are validated before any state changes.
//! 2. For keyed backends the key index mirrors the order sequence exactly.
//! 3. Every insert or erase re-indexes shifted positions before returning.

pub mod error;
pub mod iter;
pub mod map;
pub mod share;
pub mod traits;
pub mod vector;
pub mod vector_map;

pub use error::{ListError, ListResult};
pub use iter::Iter;
pub use map::MapBackend;
pub use share::ShareBackend;
pub use traits::{Backend, Inserted, KeyedBackend};
pub use vector::VecBackend;
pub use vector_map::VecMapBackend;
