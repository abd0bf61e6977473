//! Structural change notifications.
//!
//! Every structural mutation of a list is announced as a bracket: a `Begin*`
//! event naming the affected range, the mutation itself, then the matching
//! `End*` event. In-place value changes are single-shot [`ChangeEvent::Changed`]
//! events emitted after the values were written. Ranges are half-open
//! (`start..end`).

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Coarse classification of a change, as seen by a framework adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Insert,
    Remove,
    Reset,
    Changed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Remove => write!(f, "remove"),
            Self::Reset => write!(f, "reset"),
            Self::Changed => write!(f, "changed"),
        }
    }
}

/// A single notification emitted by a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Rows `start..end` are about to appear.
    BeginInsert { start: usize, end: usize },
    /// The announced insertion is complete.
    EndInsert,
    /// Rows `start..end` are about to disappear.
    BeginRemove { start: usize, end: usize },
    /// The announced removal is complete.
    EndRemove,
    /// The whole list is about to be replaced.
    BeginReset,
    /// The reset is complete.
    EndReset,
    /// Values in rows `start..end` were overwritten in place.
    Changed { start: usize, end: usize },
    /// The paging flag flipped.
    HasMoreChanged { has_more: bool },
    /// An observer should load more rows; `loaded` rows are present so far.
    FetchMoreRequested { loaded: usize, batch: usize },
}

impl ChangeEvent {
    /// Begin-insert event for `range`.
    pub fn begin_insert(range: Range<usize>) -> Self {
        Self::BeginInsert {
            start: range.start,
            end: range.end,
        }
    }

    /// Begin-remove event for `range`.
    pub fn begin_remove(range: Range<usize>) -> Self {
        Self::BeginRemove {
            start: range.start,
            end: range.end,
        }
    }

    /// Changed event for `range`.
    pub fn changed(range: Range<usize>) -> Self {
        Self::Changed {
            start: range.start,
            end: range.end,
        }
    }

    /// The structural kind of this event, if it is a structural event.
    pub fn kind(&self) -> Option<ChangeKind> {
        match self {
            Self::BeginInsert { .. } | Self::EndInsert => Some(ChangeKind::Insert),
            Self::BeginRemove { .. } | Self::EndRemove => Some(ChangeKind::Remove),
            Self::BeginReset | Self::EndReset => Some(ChangeKind::Reset),
            Self::Changed { .. } => Some(ChangeKind::Changed),
            Self::HasMoreChanged { .. } | Self::FetchMoreRequested { .. } => None,
        }
    }

    /// The affected row range, for events that carry one.
    pub fn range(&self) -> Option<Range<usize>> {
        match *self {
            Self::BeginInsert { start, end }
            | Self::BeginRemove { start, end }
            | Self::Changed { start, end } => Some(start..end),
            _ => None,
        }
    }

    /// Returns `true` for events that open a bracket.
    pub fn is_begin(&self) -> bool {
        matches!(
            self,
            Self::BeginInsert { .. } | Self::BeginRemove { .. } | Self::BeginReset
        )
    }

    /// Returns `true` for events that close a bracket.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndInsert | Self::EndRemove | Self::EndReset)
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginInsert { start, end } => write!(f, "begin insert {start}..{end}"),
            Self::EndInsert => write!(f, "end insert"),
            Self::BeginRemove { start, end } => write!(f, "begin remove {start}..{end}"),
            Self::EndRemove => write!(f, "end remove"),
            Self::BeginReset => write!(f, "begin reset"),
            Self::EndReset => write!(f, "end reset"),
            Self::Changed { start, end } => write!(f, "changed {start}..{end}"),
            Self::HasMoreChanged { has_more } => write!(f, "has more = {has_more}"),
            Self::FetchMoreRequested { loaded, batch } => {
                write!(f, "fetch more (loaded {loaded}, batch {batch})")
            }
        }
    }
}
