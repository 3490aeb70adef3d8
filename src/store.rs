use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_saved_search_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS saved_search (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    tree_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_saved_search_updated_at ON saved_search(updated_at);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSearchRecord {
    pub id: String,
    pub name: String,
    pub tree_json: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct UpsertSavedSearch<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub tree_json: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

pub fn upsert_saved_search(conn: &Connection, args: &UpsertSavedSearch<'_>) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO saved_search (id, name, tree_json, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(id) DO UPDATE SET
    name = excluded.name,
    tree_json = excluded.tree_json,
    updated_at = excluded.updated_at,
    created_at = COALESCE(saved_search.created_at, excluded.created_at)
"#,
        params![
            args.id,
            args.name,
            args.tree_json,
            args.created_at,
            args.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_saved_search(conn: &Connection, id: &str) -> Result<Option<SavedSearchRecord>> {
    conn.query_row(
        r#"
SELECT id, name, tree_json, created_at, updated_at
FROM saved_search
WHERE id = ?1
"#,
        params![id],
        |row| {
            Ok(SavedSearchRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                tree_json: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn list_saved_searches(conn: &Connection) -> Result<Vec<SavedSearchRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, name, tree_json, created_at, updated_at
FROM saved_search
ORDER BY updated_at DESC, id ASC
"#,
    )?;

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(SavedSearchRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            tree_json: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        });
    }

    Ok(result)
}

pub fn delete_saved_search(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM saved_search WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![key, value],
    )?;
    Ok(())
}
