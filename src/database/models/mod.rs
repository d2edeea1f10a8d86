// Database models - Re-exports all domain-specific models
//
// - search_query.rs: Cached search queries and their remote keys
// - saved_search.rs: Saved searches and search history
// - tag.rs: Wallhaven tags

mod search_query;
mod saved_search;
mod tag;

pub use search_query::{SearchQueryRow, RemoteKey};
pub use saved_search::{SavedSearch, SearchHistoryEntry};
pub use tag::WallhavenTag;
