use serde::{Deserialize, Serialize};

/// Configuration for a [`RosterList`](crate::RosterList).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Positions reserved in the backend up front.
    pub capacity: usize,
    /// Initial value of the paging flag.
    pub has_more: bool,
    /// Batch size reported with fetch-more requests.
    pub fetch_batch: usize,
    /// Capacity of the broadcast channel behind `subscribe`. A subscriber
    /// that falls further behind than this misses the oldest events.
    pub event_capacity: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            has_more: false,
            fetch_batch: 50,
            event_capacity: 1024,
        }
    }
}

impl ListConfig {
    /// A configuration for a paged list that starts out expecting more rows.
    pub fn paged(fetch_batch: usize) -> Self {
        Self {
            has_more: true,
            fetch_batch,
            ..Default::default()
        }
    }
}
