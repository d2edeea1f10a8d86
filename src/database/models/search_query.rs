// Database models - Cached search queries and paging keys
use serde::{Deserialize, Serialize};

use crate::search::SearchSpec;

/// A search the pager has fetched results for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQueryRow {
    pub id: i64,
    pub search: SearchSpec,
    pub last_updated_on: i64,
}

/// Paging cursor for one cached search
///
/// `next_page_number` is `None` once the last page has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKey {
    pub id: i64,
    pub search_query_id: i64,
    pub next_page_number: Option<i64>,
}
