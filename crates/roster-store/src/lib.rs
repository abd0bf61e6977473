//! Shared item storage for roster lists.
//!
//! A shared store is a keyed pool of items that several lists can reference
//! at the same time. Each list holds keys, never values; the store keeps one
//! copy of every item and counts which lists currently hold it.
//!
//! # Backends
//!
//! All stores implement the [`SharedStore`] trait:
//!
//! - [`InMemorySharedStore`] -- `HashMap`-based store with per-holder accounting
//!
//! # Design Rules
//!
//! 1. One value per key. Writing an existing key replaces the value for every
//!    holder.
//! 2. A hold is taken only when a list reports the key as new to it.
//! 3. A key is evicted only when its last hold is released.
//! 4. Each call is individually atomic; the store serializes concurrent
//!    callers itself.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemorySharedStore;
pub use traits::{Shareable, SharedStore};
