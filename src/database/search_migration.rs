// Search migration (schema v3 -> v4)
// Re-encodes every stored search from the legacy query string format to JSON
// documents and moves the tag tables under the Wallhaven namespace.
//
// The whole upgrade is one transaction: either every row is rewritten and
// version 4 is recorded, or nothing changes and the store stays at v3.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

use super::migrations::SEARCH_DOCUMENT_VERSION;
use crate::search::legacy::{self, LegacyDecode};
use crate::search::{encode_filters, encode_spec, SearchFilters};

/// Generic table name -> source-qualified name
const TABLE_RENAMES: [(&str, &str); 2] = [
    ("tags", "wallhaven_tags"),
    ("popular_tags", "wallhaven_popular_tags"),
];

/// Tables storing a `query` column next to a legacy `filters` column
const FILTER_TABLES: [&str; 2] = ["saved_searches", "search_history"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    NotMigrated,
    Migrating,
    /// Terminal: version 4 committed
    Migrated,
    /// Terminal: rolled back, version unchanged
    Failed,
}

impl MigrationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MigrationState::Migrated | MigrationState::Failed)
    }
}

/// What the migration rewrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub search_queries: usize,
    /// Cached queries dropped because they encode identically to a lower id
    pub merged_search_queries: usize,
    pub saved_searches: usize,
    pub history_entries: usize,
    pub dropped_remote_keys: usize,
}

/// One-shot driver for the v4 upgrade
#[derive(Debug)]
pub struct SearchMigration {
    state: MigrationState,
}

impl SearchMigration {
    pub fn new() -> Self {
        Self {
            state: MigrationState::NotMigrated,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Run the migration; on error the transaction has been rolled back
    pub fn run(&mut self, conn: &Connection) -> Result<MigrationReport> {
        if self.state != MigrationState::NotMigrated {
            bail!("Search migration cannot run from state {:?}", self.state);
        }

        log::info!("Running database migration v4 - Search documents and Wallhaven tables");
        self.state = MigrationState::Migrating;

        match migrate_in_transaction(conn) {
            Ok(report) => {
                self.state = MigrationState::Migrated;
                log::info!(
                    "Migration v4 completed successfully: {} queries ({} merged), {} saved searches, {} history entries, {} remote keys dropped",
                    report.search_queries,
                    report.merged_search_queries,
                    report.saved_searches,
                    report.history_entries,
                    report.dropped_remote_keys,
                );
                Ok(report)
            }
            Err(e) => {
                self.state = MigrationState::Failed;
                log::error!("Migration v4 failed and was rolled back: {:#}", e);
                Err(e)
            }
        }
    }
}

impl Default for SearchMigration {
    fn default() -> Self {
        Self::new()
    }
}

fn migrate_in_transaction(conn: &Connection) -> Result<MigrationReport> {
    let tx = conn.unchecked_transaction()
        .context("Failed to begin migration v4")?;

    rename_source_tables(&tx)?;

    let mut report = MigrationReport::default();
    migrate_search_queries(&tx, &mut report)?;
    report.saved_searches = migrate_filter_rows(&tx, FILTER_TABLES[0])?;
    report.history_entries = migrate_filter_rows(&tx, FILTER_TABLES[1])?;
    report.dropped_remote_keys += drop_orphaned_remote_keys(&tx)?;

    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        params![SEARCH_DOCUMENT_VERSION],
    ).context("Failed to record migration v4")?;

    tx.commit().context("Failed to commit migration v4")?;
    Ok(report)
}

fn rename_source_tables(conn: &Connection) -> Result<()> {
    for (from, to) in TABLE_RENAMES {
        conn.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", from, to))
            .with_context(|| format!("Failed to rename table {} to {}", from, to))?;
    }
    Ok(())
}

/// Rewrite `search_query` rows under their original ids
fn migrate_search_queries(conn: &Connection, report: &mut MigrationReport) -> Result<()> {
    let rows = {
        let mut stmt = conn.prepare(
            "SELECT id, query_string, last_updated_on FROM search_query ORDER BY id"
        ).context("Failed to prepare search_query read")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        }).context("Failed to query search_query rows")?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read search_query rows")?
    };

    // Rows ordered by id, so the first id seen for an encoding survives
    let mut survivors: Vec<(i64, String, i64)> = Vec::with_capacity(rows.len());
    let mut by_encoding: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<(i64, i64)> = Vec::new();

    for (id, query_string, last_updated_on) in rows {
        let encoded = encode_spec(&legacy::decode_legacy(&query_string));
        match by_encoding.get(&encoded) {
            Some(&index) => {
                let survivor = &mut survivors[index];
                survivor.2 = survivor.2.max(last_updated_on);
                merged.push((id, survivor.0));
            }
            None => {
                by_encoding.insert(encoded.clone(), survivors.len());
                survivors.push((id, encoded, last_updated_on));
            }
        }
    }

    for (id, survivor_id) in &merged {
        let keys = conn.execute(
            "DELETE FROM search_query_remote_keys WHERE search_query_id = ?",
            params![id],
        ).context("Failed to drop remote keys of merged search query")?;
        conn.execute("DELETE FROM search_query WHERE id = ?", params![id])
            .context("Failed to drop merged search query")?;

        log::warn!(
            "Search query {} encodes identically to {}, merged ({} remote keys dropped)",
            id, survivor_id, keys
        );
        report.dropped_remote_keys += keys;
    }

    // A new document may equal another row's old text until that row is
    // rewritten too, so uniqueness is only checked once every row is done.
    conn.execute_batch("DROP INDEX IF EXISTS index_search_query_query_string")
        .context("Failed to drop search_query uniqueness index")?;

    for (id, encoded, last_updated_on) in &survivors {
        conn.execute(
            "UPDATE search_query SET query_string = ?1, last_updated_on = ?2 WHERE id = ?3",
            params![encoded, last_updated_on, id],
        ).with_context(|| format!("Failed to rewrite search query {}", id))?;
    }

    conn.execute_batch(
        "CREATE UNIQUE INDEX index_search_query_query_string ON search_query(query_string)",
    ).context("Failed to restore search_query uniqueness index")?;

    report.search_queries = survivors.len();
    report.merged_search_queries = merged.len();
    Ok(())
}

/// Re-encode the `filters` column of `table`, returning the row count
fn migrate_filter_rows(conn: &Connection, table: &str) -> Result<usize> {
    let rows = {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, query, filters FROM {} ORDER BY id", table
        )).with_context(|| format!("Failed to prepare {} read", table))?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        }).with_context(|| format!("Failed to query {} rows", table))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read {} rows", table))?
    };

    let update = format!("UPDATE {} SET query = ?1, filters = ?2 WHERE id = ?3", table);
    for (id, query, legacy_filters) in &rows {
        let (query, filters) = reencode_filter_row(query, legacy_filters);
        conn.execute(&update, params![query, filters, id])
            .with_context(|| format!("Failed to rewrite {} row {}", table, id))?;
    }

    Ok(rows.len())
}

/// New `(query, filters)` column values for one filter row
fn reencode_filter_row(query: &str, legacy_filters: &str) -> (String, String) {
    match legacy::decode(legacy_filters) {
        LegacyDecode::Parsed(filters) => {
            (query.to_string(), encode_filters(&SearchFilters::Wallhaven(filters.into_filter_set())))
        }
        LegacyDecode::Unparseable => {
            log::warn!("Unparseable legacy filters {:?}, resetting to defaults", legacy_filters);
            let query = if query.is_empty() { legacy_filters } else { query };
            (query.to_string(), encode_filters(&SearchFilters::default()))
        }
    }
}

fn drop_orphaned_remote_keys(conn: &Connection) -> Result<usize> {
    let dropped = conn.execute(
        "DELETE FROM search_query_remote_keys WHERE search_query_id NOT IN (SELECT id FROM search_query)",
        [],
    ).context("Failed to drop orphaned remote keys")?;

    if dropped > 0 {
        log::warn!("Dropped {} remote keys referencing missing search queries", dropped);
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::{get_schema_version, migrate_to, run_migrations};

    const LEGACY_EMPTY_TAGS: &str = "includedTags=&excludedTags=&username=&tagId=&wallpaperId=&categories=anime%2Cgeneral%2Cpeople&purity=sfw&sorting=toplist&order=desc&topRange=1d&atleast=&resolutions=&ratios=&colors=&seed=";

    fn legacy_with_tag(tag: &str) -> String {
        LEGACY_EMPTY_TAGS.replacen("includedTags=", &format!("includedTags={}", tag), 1)
    }

    /// A store at v3 holding the historical fixture rows
    fn legacy_store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        migrate_to(&conn, 3).unwrap();

        conn.execute_batch(r#"
            INSERT INTO tags
                ("id", "wallhaven_id", "name", "alias", "category_id", "category", "purity", "created_at")
            VALUES
                ('1', '8099', 'Tifa Lockhart', '', '49', 'Fictional Characters', 'sfw', '1411675211000'),
                ('2', '37', 'nature', '', '5', 'Nature', 'sfw', '1391369096000'),
                ('3', '65348', '4K', '', '2', 'Art & Design', 'sfw', '1503522417000'),
                ('4', '323', 'artwork', '', '2', 'Art & Design', 'sfw', '1392110323000'),
                ('5', '175', 'anime boys', '', '20', 'Characters', 'sfw', '1391907044000'),
                ('6', '2729', 'sky', '', '5', 'Nature', 'sfw', '1403281238000'),
                ('7', '328', 'mountains', '', '41', 'Landscapes', 'sfw', '1392135639000'),
                ('8', '314', 'car', '', '54', 'Cars & Motorcycles', 'sfw', '1392093149000'),
                ('9', '3834', 'schoolgirl', '', '7', 'People', 'sfw', '1410116773000'),
                ('10', '141554', 'Kafka (Honkai: Star Rail)', '', '20', 'Characters', 'sfw', '1676084898000');

            INSERT INTO popular_tags ("id", "tag_id")
            VALUES ('201', '1'), ('202', '2'), ('203', '3'), ('204', '4'), ('205', '5'),
                   ('206', '6'), ('207', '7'), ('208', '8'), ('209', '9'), ('210', '10');
        "#).unwrap();

        for (id, blob) in [
            (1, legacy_with_tag("test")),
            (2, legacy_with_tag("test1")),
            (3, legacy_with_tag("test2")),
            (4, LEGACY_EMPTY_TAGS.to_string()),
        ] {
            conn.execute(
                "INSERT INTO search_query (id, query_string, last_updated_on) VALUES (?1, ?2, 12345)",
                params![id, blob],
            ).unwrap();
        }

        conn.execute_batch(r#"
            INSERT INTO search_query_remote_keys ("id", "search_query_id", "next_page_number")
            VALUES ('11', '2', '5'), ('12', '1', NULL), ('13', '3', '5');
        "#).unwrap();

        conn.execute(
            "INSERT INTO saved_searches (id, name, query, filters) VALUES (1, 'home', 'test', ?)",
            params![LEGACY_EMPTY_TAGS],
        ).unwrap();
        conn.execute(
            "INSERT INTO search_history (id, query, filters, last_updated_on) VALUES (1, 'test', ?, 12345)",
            params![LEGACY_EMPTY_TAGS],
        ).unwrap();

        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    fn query_string(conn: &Connection, id: i64) -> String {
        conn.query_row(
            "SELECT query_string FROM search_query WHERE id = ?",
            params![id],
            |row| row.get(0),
        ).unwrap()
    }

    fn dump(conn: &Connection) -> Vec<String> {
        let mut out = Vec::new();
        for sql in [
            "SELECT id || '|' || query_string || '|' || last_updated_on FROM search_query ORDER BY id",
            "SELECT id || '|' || search_query_id || '|' || IFNULL(next_page_number, 'null') FROM search_query_remote_keys ORDER BY id",
            "SELECT id || '|' || name || '|' || query || '|' || filters FROM saved_searches ORDER BY id",
            "SELECT id || '|' || query || '|' || filters FROM search_history ORDER BY id",
        ] {
            let mut stmt = conn.prepare(sql).unwrap();
            let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
            out.extend(rows.map(|r| r.unwrap()));
        }
        out
    }

    #[test]
    fn test_migrate_historical_rows() {
        let conn = legacy_store();
        let mut migration = SearchMigration::new();
        let report = migration.run(&conn).unwrap();

        assert_eq!(migration.state(), MigrationState::Migrated);
        assert_eq!(get_schema_version(&conn).unwrap(), 4);
        assert_eq!(report, MigrationReport {
            search_queries: 4,
            merged_search_queries: 0,
            saved_searches: 1,
            history_entries: 1,
            dropped_remote_keys: 0,
        });

        assert_eq!(count(&conn, "wallhaven_tags"), 10);
        assert_eq!(count(&conn, "wallhaven_popular_tags"), 10);
        assert_eq!(count(&conn, "search_query_remote_keys"), 3);

        assert_eq!(
            query_string(&conn, 1),
            r#"{"filters":{"includedTags":["test"],"sorting":"TOPLIST","topRange":"ONE_DAY"}}"#
        );
        assert_eq!(
            query_string(&conn, 4),
            r#"{"filters":{"sorting":"TOPLIST","topRange":"ONE_DAY"}}"#
        );

        let (query, filters): (String, String) = conn.query_row(
            "SELECT query, filters FROM saved_searches WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ).unwrap();
        assert_eq!(query, "test");
        assert_eq!(filters, r#"{"sorting":"TOPLIST","topRange":"ONE_DAY"}"#);

        let filters: String = conn.query_row(
            "SELECT filters FROM search_history WHERE id = 1",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(filters, r#"{"sorting":"TOPLIST","topRange":"ONE_DAY"}"#);
    }

    #[test]
    fn test_remote_keys_survive_unchanged() {
        let conn = legacy_store();
        SearchMigration::new().run(&conn).unwrap();

        let (id, search_query_id, next_page): (i64, i64, Option<i64>) = conn.query_row(
            "SELECT id, search_query_id, next_page_number FROM search_query_remote_keys ORDER BY id LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        ).unwrap();
        assert_eq!((id, search_query_id, next_page), (11, 2, Some(5)));
        assert_eq!(
            query_string(&conn, 2),
            r#"{"filters":{"includedTags":["test1"],"sorting":"TOPLIST","topRange":"ONE_DAY"}}"#
        );

        let exhausted: Option<i64> = conn.query_row(
            "SELECT next_page_number FROM search_query_remote_keys WHERE id = 12",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(exhausted, None);
    }

    #[test]
    fn test_popular_tags_keep_rows_and_order() {
        let conn = legacy_store();
        SearchMigration::new().run(&conn).unwrap();

        let mut stmt = conn.prepare(
            "SELECT t.name FROM wallhaven_popular_tags p JOIN wallhaven_tags t ON t.id = p.tag_id ORDER BY p.id"
        ).unwrap();
        let names: Vec<String> = stmt.query_map([], |row| row.get(0)).unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("Tifa Lockhart"));
        assert_eq!(names.last().map(String::as_str), Some("Kafka (Honkai: Star Rail)"));
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_migration_is_deterministic() {
        let first = legacy_store();
        let second = legacy_store();
        SearchMigration::new().run(&first).unwrap();
        SearchMigration::new().run(&second).unwrap();

        assert_eq!(dump(&first), dump(&second));
    }

    #[test]
    fn test_unparseable_blobs_keep_raw_text_as_query() {
        let conn = legacy_store();
        conn.execute(
            "INSERT INTO search_query (id, query_string, last_updated_on) VALUES (5, 'cyberpunk city', 1)",
            [],
        ).unwrap();
        conn.execute(
            "INSERT INTO search_history (id, query, filters, last_updated_on) VALUES (2, '', 'random words', 1)",
            [],
        ).unwrap();
        conn.execute(
            "INSERT INTO saved_searches (id, name, query, filters) VALUES (2, 'broken', 'kept', '???')",
            [],
        ).unwrap();

        SearchMigration::new().run(&conn).unwrap();

        assert_eq!(query_string(&conn, 5), r#"{"query":"cyberpunk city","filters":{}}"#);

        let (query, filters): (String, String) = conn.query_row(
            "SELECT query, filters FROM search_history WHERE id = 2",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ).unwrap();
        assert_eq!((query.as_str(), filters.as_str()), ("random words", "{}"));

        let query: String = conn.query_row(
            "SELECT query FROM saved_searches WHERE id = 2",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(query, "kept");
    }

    #[test]
    fn test_colliding_queries_merge_and_drop_their_keys() {
        let conn = legacy_store();
        // Same search as row 4 once the implicit sort defaults are applied
        conn.execute(
            "INSERT INTO search_query (id, query_string, last_updated_on) VALUES (6, 'includedTags=', 99999)",
            [],
        ).unwrap();
        conn.execute(
            "INSERT INTO search_query_remote_keys (id, search_query_id, next_page_number) VALUES (14, 6, 2)",
            [],
        ).unwrap();

        let report = SearchMigration::new().run(&conn).unwrap();

        assert_eq!(report.merged_search_queries, 1);
        assert_eq!(report.dropped_remote_keys, 1);
        assert_eq!(count(&conn, "search_query"), 4);
        assert_eq!(count(&conn, "search_query_remote_keys"), 3);

        let last_updated_on: i64 = conn.query_row(
            "SELECT last_updated_on FROM search_query WHERE id = 4",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(last_updated_on, 99999);
    }

    #[test]
    fn test_new_document_equal_to_later_old_text() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        migrate_to(&conn, 3).unwrap();
        conn.execute(
            "INSERT INTO search_query (id, query_string, last_updated_on) VALUES (1, 'sky', 1), (2, ?, 2)",
            params![r#"{"query":"sky","filters":{}}"#],
        ).unwrap();
        conn.execute(
            "INSERT INTO search_query_remote_keys (search_query_id, next_page_number) VALUES (2, 7)",
            [],
        ).unwrap();

        let report = SearchMigration::new().run(&conn).unwrap();

        assert_eq!(report.search_queries, 2);
        assert_eq!(report.merged_search_queries, 0);
        assert_eq!(query_string(&conn, 1), r#"{"query":"sky","filters":{}}"#);
        assert_eq!(
            query_string(&conn, 2),
            r#"{"query":"{\"query\":\"sky\",\"filters\":{}}","filters":{}}"#
        );
        assert_eq!(count(&conn, "search_query_remote_keys"), 1);

        // Uniqueness is enforced again afterwards
        assert!(conn.execute(
            "INSERT INTO search_query (query_string, last_updated_on) VALUES (?, 3)",
            params![r#"{"query":"sky","filters":{}}"#],
        ).is_err());
    }

    #[test]
    fn test_orphaned_remote_keys_are_dropped() {
        let conn = legacy_store();
        conn.execute("PRAGMA foreign_keys = OFF", []).unwrap();
        conn.execute(
            "INSERT INTO search_query_remote_keys (id, search_query_id, next_page_number) VALUES (15, 42, 3)",
            [],
        ).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();

        let report = SearchMigration::new().run(&conn).unwrap();

        assert_eq!(report.dropped_remote_keys, 1);
        assert_eq!(count(&conn, "search_query_remote_keys"), 3);
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let conn = legacy_store();
        // Occupies the rename target so the upgrade fails
        conn.execute_batch("CREATE TABLE wallhaven_popular_tags (id INTEGER PRIMARY KEY)").unwrap();

        let mut migration = SearchMigration::new();
        assert!(migration.run(&conn).is_err());
        assert_eq!(migration.state(), MigrationState::Failed);
        assert!(migration.state().is_terminal());

        assert_eq!(get_schema_version(&conn).unwrap(), 3);
        assert_eq!(count(&conn, "tags"), 10);
        assert_eq!(count(&conn, "popular_tags"), 10);
        assert_eq!(query_string(&conn, 1), legacy_with_tag("test"));

        // A finished driver never runs again
        assert!(migration.run(&conn).is_err());
        assert!(run_migrations(&conn).is_err());
    }
}
