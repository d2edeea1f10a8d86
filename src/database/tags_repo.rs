// Wallhaven tags repository for Wallflow
// Tags seen in API responses and the current popular tag list

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::WallhavenTag;
use super::DatabaseManager;
use crate::search::Purity;

impl DatabaseManager {
    /// Insert or update a tag by its Wallhaven id, returning the local id
    pub fn upsert_wallhaven_tag(&self, tag: &WallhavenTag) -> Result<i64> {
        self.with_connection(|conn| {
            upsert_wallhaven_tag_impl(conn, tag)
        })
    }

    /// Replace the popular tag list, keeping the given order
    pub fn replace_popular_tags(&self, tag_ids: &[i64]) -> Result<()> {
        self.with_connection(|conn| {
            replace_popular_tags_impl(conn, tag_ids)
        })
    }

    /// Get the popular tags in the order they were stored
    pub fn popular_wallhaven_tags(&self) -> Result<Vec<WallhavenTag>> {
        self.with_connection(|conn| {
            popular_wallhaven_tags_impl(conn)
        })
    }
}

fn upsert_wallhaven_tag_impl(conn: &Connection, tag: &WallhavenTag) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO wallhaven_tags (wallhaven_id, name, alias, category_id, category, purity, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(wallhaven_id) DO UPDATE SET
            name = excluded.name,
            alias = excluded.alias,
            category_id = excluded.category_id,
            category = excluded.category,
            purity = excluded.purity
        "#,
        params![
            tag.wallhaven_id,
            tag.name,
            tag.alias,
            tag.category_id,
            tag.category,
            tag.purity.legacy_token(),
            tag.created_at,
        ],
    ).with_context(|| format!("Failed to upsert tag {:?}", tag.name))?;

    conn.query_row(
        "SELECT id FROM wallhaven_tags WHERE wallhaven_id = ?",
        params![tag.wallhaven_id],
        |row| row.get(0),
    ).context("Failed to read tag id")
}

fn replace_popular_tags_impl(conn: &Connection, tag_ids: &[i64]) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Failed to begin popular tags transaction")?;

    tx.execute("DELETE FROM wallhaven_popular_tags", [])
        .context("Failed to clear popular tags")?;

    for tag_id in tag_ids {
        tx.execute(
            "INSERT INTO wallhaven_popular_tags (tag_id) VALUES (?)",
            params![tag_id],
        ).with_context(|| format!("Failed to add popular tag {}", tag_id))?;
    }

    tx.commit().context("Failed to commit popular tags")?;
    Ok(())
}

fn popular_wallhaven_tags_impl(conn: &Connection) -> Result<Vec<WallhavenTag>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.id, t.wallhaven_id, t.name, t.alias, t.category_id, t.category, t.purity, t.created_at
        FROM wallhaven_popular_tags p
        JOIN wallhaven_tags t ON t.id = p.tag_id
        ORDER BY p.id ASC
        "#
    ).context("Failed to prepare popular tags query")?;

    let tags = stmt.query_map([], |row| {
        let purity: String = row.get(6)?;
        Ok(WallhavenTag {
            id: row.get(0)?,
            wallhaven_id: row.get(1)?,
            name: row.get(2)?,
            alias: row.get(3)?,
            category_id: row.get(4)?,
            category: row.get(5)?,
            purity: Purity::from_legacy_token(&purity).unwrap_or_else(|| {
                log::debug!("Unknown tag purity {:?}, treating as sfw", purity);
                Purity::Sfw
            }),
            created_at: row.get(7)?,
        })
    }).context("Failed to query popular tags")?;

    tags.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect popular tags")
}
