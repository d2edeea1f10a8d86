// Wallflow store - search persistence for the Wallflow wallpaper client
//
// - search: the search model and its legacy/current encodings
// - database: SQLite store, schema migrations and repositories
// - config: where the store lives and how much history it keeps

// Token enum macro, used by the search model
#[macro_use]
pub mod macros;

pub mod config;
pub mod database;
pub mod search;

pub use config::StoreConfig;
pub use database::DatabaseManager;

/// Initialize env_logger to output to stderr (reads RUST_LOG env var)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
