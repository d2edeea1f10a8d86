// Search history repository for Wallflow
// Recently run searches, most recent first, pruned to the configured limit

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::SearchHistoryEntry;
use super::DatabaseManager;
use crate::search::{decode_filters, encode_filters, SearchSpec};

impl DatabaseManager {
    /// Record a search run, moving it to the top of the history
    pub fn record_search(&self, search: &SearchSpec) -> Result<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        let limit = self.config().history_limit;
        self.with_connection(|conn| {
            record_search_impl(conn, search, now, limit)
        })
    }

    /// Get the most recent searches
    pub fn recent_searches(&self, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
        self.with_connection(|conn| {
            recent_searches_impl(conn, limit)
        })
    }

    /// Delete one history entry
    pub fn delete_search_history_entry(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM search_history WHERE id = ?", params![id])
                .context("Failed to delete search history entry")?;
            Ok(())
        })
    }

    /// Delete the whole history
    pub fn clear_search_history(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM search_history", [])
                .context("Failed to clear search history")?;
            Ok(())
        })
    }
}

fn record_search_impl(conn: &Connection, search: &SearchSpec, now: i64, limit: usize) -> Result<i64> {
    if limit == 0 {
        anyhow::bail!("Search history limit must be at least 1");
    }

    let filters = encode_filters(&search.filters);

    let existing: Option<i64> = conn.query_row(
        "SELECT id FROM search_history WHERE query = ?1 AND filters = ?2",
        params![search.query, filters],
        |row| row.get(0),
    ).optional().context("Failed to look up search history entry")?;

    let id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE search_history SET last_updated_on = ?1 WHERE id = ?2",
                params![now, id],
            ).context("Failed to update search history entry")?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO search_history (query, filters, last_updated_on) VALUES (?1, ?2, ?3)",
                params![search.query, filters, now],
            ).context("Failed to insert search history entry")?;
            conn.last_insert_rowid()
        }
    };

    let pruned = conn.execute(
        r#"
        DELETE FROM search_history WHERE id NOT IN (
            SELECT id FROM search_history
            ORDER BY last_updated_on DESC, id DESC
            LIMIT ?
        )
        "#,
        params![limit as i64],
    ).context("Failed to prune search history")?;

    if pruned > 0 {
        log::debug!("Pruned {} search history entries", pruned);
    }

    Ok(id)
}

fn recent_searches_impl(conn: &Connection, limit: usize) -> Result<Vec<SearchHistoryEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, query, filters, last_updated_on FROM search_history
        ORDER BY last_updated_on DESC, id DESC
        LIMIT ?
        "#
    ).context("Failed to prepare recent_searches query")?;

    let entries = stmt.query_map(params![limit as i64], |row| {
        let filters: String = row.get(2)?;
        Ok(SearchHistoryEntry {
            id: row.get(0)?,
            search: SearchSpec::new(row.get::<_, String>(1)?, decode_filters(&filters).unwrap_or_default()),
            last_updated_on: row.get(3)?,
        })
    }).context("Failed to query search history")?;

    entries.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect search history")
}
