// Database models - Wallhaven tags
use serde::{Deserialize, Serialize};

use crate::search::Purity;

/// A tag as reported by the Wallhaven API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallhavenTag {
    pub id: i64,
    pub wallhaven_id: i64,
    pub name: String,
    pub alias: String,
    pub category_id: i64,
    pub category: String,
    pub purity: Purity,
    pub created_at: i64,
}

impl WallhavenTag {
    pub fn new(wallhaven_id: i64, name: impl Into<String>, category_id: i64, category: impl Into<String>) -> Self {
        Self {
            id: 0,
            wallhaven_id,
            name: name.into(),
            alias: String::new(),
            category_id,
            category: category.into(),
            purity: Purity::Sfw,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
