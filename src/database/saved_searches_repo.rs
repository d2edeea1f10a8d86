// Saved searches repository for Wallflow
// Handles CRUD operations for searches saved under a unique name

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::models::SavedSearch;
use super::DatabaseManager;
use crate::search::{decode_filters, encode_filters, SearchSpec};

impl DatabaseManager {
    /// Get all saved searches, ordered by name
    pub fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        self.with_connection(|conn| {
            list_saved_searches_impl(conn)
        })
    }

    /// Get a saved search by ID
    pub fn get_saved_search(&self, id: i64) -> Result<Option<SavedSearch>> {
        self.with_connection(|conn| {
            get_saved_search_where(conn, "id = ?", &id)
        })
    }

    /// Get a saved search by name
    pub fn get_saved_search_by_name(&self, name: &str) -> Result<Option<SavedSearch>> {
        self.with_connection(|conn| {
            get_saved_search_where(conn, "name = ?", &name)
        })
    }

    /// Save a search under `name`, replacing any search already saved with that name
    pub fn upsert_saved_search(&self, name: &str, search: &SearchSpec) -> Result<i64> {
        self.with_connection(|conn| {
            upsert_saved_search_impl(conn, name, search)
        })
    }

    /// Rename a saved search; fails if the new name is taken
    pub fn rename_saved_search(&self, id: i64, name: &str) -> Result<()> {
        self.with_connection(|conn| {
            rename_saved_search_impl(conn, id, name)
        })
    }

    /// Delete a saved search
    pub fn delete_saved_search(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM saved_searches WHERE id = ?", params![id])
                .context("Failed to delete saved search")?;
            Ok(())
        })
    }
}

fn row_to_saved_search(row: &Row<'_>) -> rusqlite::Result<SavedSearch> {
    let filters: String = row.get(3)?;
    Ok(SavedSearch {
        id: row.get(0)?,
        name: row.get(1)?,
        search: SearchSpec::new(row.get::<_, String>(2)?, decode_filters(&filters).unwrap_or_default()),
    })
}

fn list_saved_searches_impl(conn: &Connection) -> Result<Vec<SavedSearch>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, query, filters FROM saved_searches ORDER BY name ASC"
    ).context("Failed to prepare list_saved_searches query")?;

    let searches = stmt.query_map([], row_to_saved_search)
        .context("Failed to query saved searches")?;

    searches.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect saved searches")
}

fn get_saved_search_where(
    conn: &Connection,
    condition: &str,
    value: &dyn rusqlite::ToSql,
) -> Result<Option<SavedSearch>> {
    let sql = format!("SELECT id, name, query, filters FROM saved_searches WHERE {}", condition);
    let result = conn.query_row(&sql, [value], row_to_saved_search);

    match result {
        Ok(search) => Ok(Some(search)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get saved search"),
    }
}

fn upsert_saved_search_impl(conn: &Connection, name: &str, search: &SearchSpec) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO saved_searches (name, query, filters)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(name) DO UPDATE SET
            query = excluded.query,
            filters = excluded.filters
        "#,
        params![name, search.query, encode_filters(&search.filters)],
    ).context("Failed to save search")?;

    conn.query_row(
        "SELECT id FROM saved_searches WHERE name = ?",
        params![name],
        |row| row.get(0),
    ).context("Failed to read saved search id")
}

fn rename_saved_search_impl(conn: &Connection, id: i64, name: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE saved_searches SET name = ?1 WHERE id = ?2",
        params![name, id],
    ).with_context(|| format!("Failed to rename saved search to {:?}", name))?;

    if updated == 0 {
        anyhow::bail!("Saved search not found: {}", id);
    }
    Ok(())
}
