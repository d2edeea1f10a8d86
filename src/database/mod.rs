// Database module for Wallflow
// SQLite persistence for cached searches, remote keys, saved searches, search history and tags

pub mod manager;
pub mod migrations;
pub mod models;
pub mod search_migration;
pub mod search_query_repo;
pub mod remote_keys_repo;
pub mod saved_searches_repo;
pub mod search_history_repo;
pub mod tags_repo;

pub use manager::DatabaseManager;
pub use models::*;
pub use search_migration::{MigrationReport, MigrationState, SearchMigration};
