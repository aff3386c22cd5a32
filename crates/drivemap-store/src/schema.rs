//! Schema creation for the SQLite store.
//!
//! The `files` table carries a fixed set of columns plus `tag_1..tag_K`.
//! All statements are generated once from K when a store is opened.

use itertools::Itertools;
use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

/// Name of the inventory table.
pub const TABLE: &str = "files";

/// Columns preceding the tag columns, in table order.
pub const BASE_COLUMNS: [&str; 4] = ["name", "fullpath", "extension", "size"];

/// Pragmas for a single long-lived writer; commits stay durable per batch.
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
PRAGMA cache_size = -64000;
"#;

/// Name of the 1-based tag column `index`.
pub fn tag_column(index: usize) -> String {
    format!("tag_{index}")
}

fn tag_columns(tag_count: usize) -> impl Iterator<Item = String> {
    (1..=tag_count).map(tag_column)
}

/// `CREATE TABLE IF NOT EXISTS` statement for K tag columns.
pub fn create_table_sql(tag_count: usize) -> String {
    let tags = tag_columns(tag_count)
        .map(|column| format!(",\n    {column} TEXT"))
        .join("");
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (\n    name TEXT,\n    fullpath TEXT UNIQUE,\n    extension TEXT,\n    size INTEGER{tags}\n)"
    )
}

/// `INSERT OR IGNORE` statement with one positional parameter per column.
pub fn insert_sql(tag_count: usize) -> String {
    let columns = BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(tag_columns(tag_count))
        .join(", ");
    let params = (1..=BASE_COLUMNS.len() + tag_count)
        .map(|i| format!("?{i}"))
        .join(", ");
    format!("INSERT OR IGNORE INTO {TABLE} ({columns}) VALUES ({params})")
}

/// `SELECT` of every column in table order.
pub fn select_sql(tag_count: usize) -> String {
    let columns = BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(tag_columns(tag_count))
        .join(", ");
    format!("SELECT {columns} FROM {TABLE}")
}

/// Create the `files` table if absent and verify an existing one.
///
/// Idempotent against a correctly shaped table. A table created with a
/// different K is rejected.
pub fn initialize(conn: &Connection, tag_count: usize) -> StoreResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;
    conn.execute(&create_table_sql(tag_count), [])?;
    verify(conn, tag_count)?;
    tracing::debug!(table = TABLE, tag_count, "store schema ready");
    Ok(())
}

/// Column names of the `files` table in declaration order.
pub fn table_columns(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({TABLE})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn verify(conn: &Connection, tag_count: usize) -> StoreResult<()> {
    let columns = table_columns(conn)?;

    for required in BASE_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(StoreError::MissingColumn {
                column: required.to_string(),
            });
        }
    }

    let found = columns.iter().filter(|c| c.starts_with("tag_")).count();
    if found != tag_count {
        return Err(StoreError::TagCountMismatch {
            expected: tag_count,
            found,
        });
    }
    Ok(())
}
