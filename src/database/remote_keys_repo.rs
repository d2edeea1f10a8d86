// Remote keys repository for Wallflow
// Paging cursors for cached searches

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::RemoteKey;
use super::DatabaseManager;

impl DatabaseManager {
    /// Get the paging cursor for a cached search
    pub fn get_remote_key(&self, search_query_id: i64) -> Result<Option<RemoteKey>> {
        self.with_connection(|conn| {
            get_remote_key_impl(conn, search_query_id)
        })
    }

    /// Set the next page to fetch; `None` marks the search as exhausted
    pub fn set_remote_key(&self, search_query_id: i64, next_page_number: Option<i64>) -> Result<()> {
        self.with_connection(|conn| {
            set_remote_key_impl(conn, search_query_id, next_page_number)
        })
    }

    /// Forget the paging cursor for a cached search
    pub fn delete_remote_keys(&self, search_query_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            delete_remote_keys_impl(conn, search_query_id)
        })
    }
}

fn get_remote_key_impl(conn: &Connection, search_query_id: i64) -> Result<Option<RemoteKey>> {
    let result = conn.query_row(
        "SELECT id, search_query_id, next_page_number FROM search_query_remote_keys WHERE search_query_id = ?",
        params![search_query_id],
        |row| {
            Ok(RemoteKey {
                id: row.get(0)?,
                search_query_id: row.get(1)?,
                next_page_number: row.get(2)?,
            })
        },
    );

    match result {
        Ok(key) => Ok(Some(key)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get remote key"),
    }
}

fn set_remote_key_impl(conn: &Connection, search_query_id: i64, next_page_number: Option<i64>) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO search_query_remote_keys (search_query_id, next_page_number)
        VALUES (?1, ?2)
        ON CONFLICT(search_query_id) DO UPDATE SET
            next_page_number = excluded.next_page_number
        "#,
        params![search_query_id, next_page_number],
    ).context("Failed to set remote key")?;

    Ok(())
}

fn delete_remote_keys_impl(conn: &Connection, search_query_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM search_query_remote_keys WHERE search_query_id = ?",
        params![search_query_id],
    ).context("Failed to delete remote keys")?;

    Ok(())
}
