//! Foundation types for roster.
//!
//! This crate provides the small vocabulary every other roster crate shares:
//! how an item names itself, how a list identifies itself to a shared store,
//! and what a structural change notification looks like.
//!
//! # Key Types
//!
//! - [`Keyed`]: Per-item-type policy deriving a stable identity key
//! - [`KeyOf`]: Shorthand for the key type of a [`Keyed`] item
//! - [`ListId`]: Time-ordered identity of one list instance (UUID v7)
//! - [`ChangeEvent`] / [`ChangeKind`]: Bracketed structural change notifications

pub mod error;
pub mod event;
pub mod id;
pub mod key;

pub use error::TypeError;
pub use event::{ChangeEvent, ChangeKind};
pub use id::ListId;
pub use key::{KeyOf, Keyed};
