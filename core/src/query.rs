//! Pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 100;

/// A window into a sorted result set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of items.
    pub limit: u32,
    /// Items to skip.
    pub skip: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl Page {
    /// Builds a page from optional query parameters; a zero limit means the
    /// default, larger limits are capped.
    #[must_use]
    pub fn new(limit: Option<u32>, skip: Option<u64>) -> Self {
        let limit = match limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(n) => n.min(MAX_LIMIT),
        };
        Self {
            limit,
            skip: skip.unwrap_or(0),
        }
    }

    /// Applies the window to an already sorted iterator.
    pub fn slice<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.skip).unwrap_or(usize::MAX))
            .take(self.limit as usize)
            .collect()
    }
}

/// One page of results plus the size of the whole result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Items matching the filter across all pages.
    pub total: u64,
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}
