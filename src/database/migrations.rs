// Database migrations for Wallflow
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::search_migration::SearchMigration;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 4;

/// First version storing searches as JSON documents under source-qualified tag tables
pub const SEARCH_DOCUMENT_VERSION: i32 = 4;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    migrate_to(conn, SCHEMA_VERSION)
}

/// Run migrations up to and including `target`
pub(crate) fn migrate_to(conn: &Connection, target: i32) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 && target >= 1 {
        apply_step(conn, 1, migrate_v1)?;
    }

    if current_version < 2 && target >= 2 {
        apply_step(conn, 2, migrate_v2)?;
    }

    if current_version < 3 && target >= 3 {
        apply_step(conn, 3, migrate_v3)?;
    }

    if current_version < 4 && target >= 4 {
        // Owns its transaction and version bump
        SearchMigration::new().run(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    ).context("Failed to check for schema_version table")?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    ).context("Failed to read schema version")?;

    Ok(version.unwrap_or(0))
}

/// Run one schema step and record its version, atomically
fn apply_step(conn: &Connection, version: i32, step: fn(&Connection) -> Result<()>) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .with_context(|| format!("Failed to begin migration v{}", version))?;

    step(&tx)?;

    tx.execute("INSERT INTO schema_version (version) VALUES (?)", params![version])
        .with_context(|| format!("Failed to record migration v{}", version))?;
    tx.commit()
        .with_context(|| format!("Failed to commit migration v{}", version))?;

    log::info!("Migration v{} completed successfully", version);
    Ok(())
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Searches the pager has fetched, encoded as a query string
        CREATE TABLE IF NOT EXISTS search_query (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            query_string TEXT NOT NULL,
            last_updated_on INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_search_query_query_string
        ON search_query(query_string);

        -- Next page to fetch for each cached search, NULL when exhausted
        CREATE TABLE IF NOT EXISTS search_query_remote_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            search_query_id INTEGER NOT NULL,
            next_page_number INTEGER,
            FOREIGN KEY (search_query_id) REFERENCES search_query(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_search_query_remote_keys_search_query_id
        ON search_query_remote_keys(search_query_id);

        -- Wallhaven tags
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            wallhaven_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            alias TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            purity TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_tags_wallhaven_id ON tags(wallhaven_id);
        CREATE UNIQUE INDEX IF NOT EXISTS index_tags_name ON tags(name);

        -- Popular tags, in the order Wallhaven listed them
        CREATE TABLE IF NOT EXISTS popular_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            tag_id INTEGER NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_popular_tags_tag_id ON popular_tags(tag_id);

        -- Searches the user ran
        CREATE TABLE IF NOT EXISTS search_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            query TEXT NOT NULL,
            filters TEXT NOT NULL,
            last_updated_on INTEGER NOT NULL
        );
    "#).context("Failed to run migration v1")?;

    Ok(())
}

/// Saved searches (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2 - Saved searches");

    conn.execute_batch(r#"
        CREATE TABLE IF NOT EXISTS saved_searches (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            query TEXT NOT NULL,
            filters TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS index_saved_searches_name ON saved_searches(name);
    "#).context("Failed to run migration v2")?;

    Ok(())
}

/// Search history recency index (version 3)
fn migrate_v3(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v3 - Search history recency index");

    conn.execute_batch(r#"
        CREATE INDEX IF NOT EXISTS index_search_history_last_updated_on
        ON search_history(last_updated_on DESC);
    "#).context("Failed to run migration v3")?;

    Ok(())
}
