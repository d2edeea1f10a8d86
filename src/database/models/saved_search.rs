// Database models - Saved searches and search history
use serde::{Deserialize, Serialize};

use crate::search::SearchSpec;

/// A search the user saved under a unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: i64,
    pub name: String,
    pub search: SearchSpec,
}

/// A previously run search, most recent first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub search: SearchSpec,
    pub last_updated_on: i64,
}
