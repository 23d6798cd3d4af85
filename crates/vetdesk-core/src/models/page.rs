//! Paginated list envelope.

use serde::{Deserialize, Serialize};

/// One page of a list endpoint: `{count, next, previous, results}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Total number of records across all pages
    #[serde(default)]
    pub count: u64,
    /// Absolute URL of the next page, if any
    #[serde(default)]
    pub next: Option<String>,
    /// Absolute URL of the previous page, if any
    #[serde(default)]
    pub previous: Option<String>,
    /// Records on this page
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }
}
