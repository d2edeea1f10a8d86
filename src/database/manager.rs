// Store handle for Wallflow
// One SQLite connection behind a mutex; repositories borrow it through `with_connection`

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::migrations;
use crate::config::StoreConfig;

/// Owns the store's connection and configuration
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    config: StoreConfig,
}

impl DatabaseManager {
    /// Open the store described by `config`, migrating it to the current schema
    ///
    /// Migration blocks until done. A failed migration is rolled back and
    /// returned as an error, and the store must not be used.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let conn = open_connection(&config.db_path)?;

        migrations::run_migrations(&conn)
            .with_context(|| format!("Failed to migrate store at {:?}", config.db_path))?;

        log::info!(
            "Store ready at {:?} (schema v{})",
            config.db_path,
            migrations::SCHEMA_VERSION
        );

        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    /// Open a store at `db_path` with default settings
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::new(db_path))
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| anyhow::anyhow!("Store connection lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.config.db_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

// Remote keys rely on ON DELETE CASCADE, which SQLite only honours per connection.
fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create store directory {:?}", dir))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open store at {:?}", path))?;
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .context("Failed to enable foreign key enforcement")?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let manager = DatabaseManager::open(db_path.clone()).unwrap();
        assert!(db_path.exists());

        manager.with_connection(|conn| {
            let version = migrations::get_schema_version(conn)?;
            assert_eq!(version, migrations::SCHEMA_VERSION);

            let count: i32 = conn.query_row(
                "SELECT COUNT(*) FROM search_query",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 0);
            Ok(())
        }).unwrap();
    }

    #[test]
    fn test_reopen_existing_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let manager = DatabaseManager::open(db_path.clone()).unwrap();
            manager.upsert_saved_search("home", &Default::default()).unwrap();
        }

        let manager = DatabaseManager::open(db_path).unwrap();
        assert_eq!(manager.list_saved_searches().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_migration_fails_open() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        {
            let conn = Connection::open(&db_path).unwrap();
            migrations::migrate_to(&conn, 3).unwrap();
            conn.execute_batch("CREATE TABLE wallhaven_tags (id INTEGER PRIMARY KEY)").unwrap();
        }

        assert!(DatabaseManager::open(db_path.clone()).is_err());

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(migrations::get_schema_version(&conn).unwrap(), 3);
    }
}
