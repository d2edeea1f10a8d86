// Search query repository for Wallflow
// Cache of searches the pager has fetched, keyed by their encoded document

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::models::SearchQueryRow;
use super::DatabaseManager;
use crate::search::{decode_spec, encode_spec, SearchSpec};

impl DatabaseManager {
    /// Insert a search or bump its timestamp, returning its id
    pub fn upsert_search_query(&self, search: &SearchSpec) -> Result<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        self.with_connection(|conn| {
            upsert_search_query_impl(conn, search, now)
        })
    }

    /// Get a cached search by id
    pub fn get_search_query(&self, id: i64) -> Result<Option<SearchQueryRow>> {
        self.with_connection(|conn| {
            get_search_query_impl(conn, id)
        })
    }

    /// Find the cached row for a search
    pub fn find_search_query(&self, search: &SearchSpec) -> Result<Option<SearchQueryRow>> {
        self.with_connection(|conn| {
            find_search_query_impl(conn, search)
        })
    }

    /// Delete searches not touched since `before` (ms), with their remote keys
    pub fn delete_search_queries_before(&self, before: i64) -> Result<usize> {
        self.with_connection(|conn| {
            delete_search_queries_before_impl(conn, before)
        })
    }
}

fn row_to_search_query(row: &Row<'_>) -> rusqlite::Result<SearchQueryRow> {
    let query_string: String = row.get(1)?;
    Ok(SearchQueryRow {
        id: row.get(0)?,
        search: decode_spec(&query_string),
        last_updated_on: row.get(2)?,
    })
}

pub(crate) fn upsert_search_query_impl(conn: &Connection, search: &SearchSpec, now: i64) -> Result<i64> {
    let query_string = encode_spec(search);

    conn.execute(
        r#"
        INSERT INTO search_query (query_string, last_updated_on)
        VALUES (?1, ?2)
        ON CONFLICT(query_string) DO UPDATE SET
            last_updated_on = excluded.last_updated_on
        "#,
        params![query_string, now],
    ).context("Failed to upsert search query")?;

    conn.query_row(
        "SELECT id FROM search_query WHERE query_string = ?",
        params![query_string],
        |row| row.get(0),
    ).context("Failed to read search query id")
}

fn get_search_query_impl(conn: &Connection, id: i64) -> Result<Option<SearchQueryRow>> {
    let result = conn.query_row(
        "SELECT id, query_string, last_updated_on FROM search_query WHERE id = ?",
        params![id],
        row_to_search_query,
    );

    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get search query"),
    }
}

fn find_search_query_impl(conn: &Connection, search: &SearchSpec) -> Result<Option<SearchQueryRow>> {
    let result = conn.query_row(
        "SELECT id, query_string, last_updated_on FROM search_query WHERE query_string = ?",
        params![encode_spec(search)],
        row_to_search_query,
    );

    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to find search query"),
    }
}

fn delete_search_queries_before_impl(conn: &Connection, before: i64) -> Result<usize> {
    // Remote keys go with their query through ON DELETE CASCADE
    conn.execute(
        "DELETE FROM search_query WHERE last_updated_on < ?",
        params![before],
    ).context("Failed to delete stale search queries")
}
