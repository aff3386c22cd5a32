//! SQLite-backed record store.

use std::io::Write;
use std::path::{Path, PathBuf};

use drivemap_core::FileRecord;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, ToSql, params_from_iter};

use crate::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::export;
use crate::schema;

/// Durable store holding one `files` table.
///
/// Keeps a single open connection for its whole lifetime.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    tag_count: usize,
    insert_sql: String,
}

impl SqliteStore {
    /// Open (or create) the database and run the schema initializer.
    pub fn open(path: impl AsRef<Path>, tag_count: usize) -> StoreResult<Self> {
        let path = path.as_ref();
        Self::with_connection(Connection::open(path)?, path, tag_count)
    }

    /// Open an existing database, taking the tag count from its table.
    ///
    /// Never creates a file: a missing database is an error.
    pub fn open_existing(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let columns = schema::table_columns(&conn)?;
        if columns.is_empty() {
            return Err(StoreError::MissingColumn {
                column: schema::BASE_COLUMNS[1].to_string(),
            });
        }
        let tag_count = columns.iter().filter(|c| c.starts_with("tag_")).count();

        Self::with_connection(conn, path, tag_count)
    }

    fn with_connection(conn: Connection, path: &Path, tag_count: usize) -> StoreResult<Self> {
        schema::initialize(&conn, tag_count)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            tag_count,
            insert_sql: schema::insert_sql(tag_count),
        })
    }

    /// Number of tag columns in this store.
    pub fn tag_count(&self) -> usize {
        self.tag_count
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", schema::TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Load every stored record, in store order.
    pub fn records(&self) -> StoreResult<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(&schema::select_sql(self.tag_count))?;
        let tag_count = self.tag_count;
        let records = stmt
            .query_map([], |row| {
                let size: i64 = row.get(3)?;
                let size = u64::try_from(size).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(e))
                })?;
                let tags = (0..tag_count)
                    .map(|i| row.get::<_, Option<String>>(schema::BASE_COLUMNS.len() + i))
                    .map(|tag| tag.map(Option::unwrap_or_default))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FileRecord {
                    name: row.get(0)?,
                    fullpath: row.get(1)?,
                    extension: row.get(2)?,
                    size,
                    tags,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Write every stored row as CSV. Returns the number of data rows.
    pub fn export_csv<W: Write>(&self, writer: W) -> StoreResult<u64> {
        export::export_csv(&self.conn, self.tag_count, writer)
    }
}

impl RecordStore for SqliteStore {
    fn insert_batch(&mut self, batch: &[FileRecord]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in batch {
                let size =
                    i64::try_from(record.size).map_err(|_| StoreError::SizeOutOfRange {
                        path: record.fullpath.clone(),
                        size: record.size,
                    })?;
                let mut values: Vec<&dyn ToSql> = Vec::with_capacity(4 + record.tags.len());
                values.push(&record.name as &dyn ToSql);
                values.push(&record.fullpath as &dyn ToSql);
                values.push(&record.extension as &dyn ToSql);
                values.push(&size as &dyn ToSql);
                values.extend(record.tags.iter().map(|tag| tag as &dyn ToSql));

                inserted += stmt.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord {
            name: path.rsplit('/').next().unwrap().to_string(),
            fullpath: path.to_string(),
            extension: ".txt".to_string(),
            size,
            tags: vec!["r".to_string(), String::new()],
        }
    }

    #[test]
    fn test_insert_or_ignore() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("files.db"), 2).unwrap();

        let inserted = store
            .insert_batch(&[record("/r/a.txt", 10), record("/r/b.txt", 5)])
            .unwrap();
        assert_eq!(inserted, 2);

        // Same path with a different size is ignored, never overwritten.
        let inserted = store
            .insert_batch(&[record("/r/a.txt", 999), record("/r/c.txt", 1)])
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.row_count().unwrap(), 3);

        let a = store
            .records()
            .unwrap()
            .into_iter()
            .find(|r| r.fullpath == "/r/a.txt")
            .unwrap();
        assert_eq!(a.size, 10);
        assert_eq!(a.tags, vec!["r", ""]);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("files.db"), 2).unwrap();

        let inserted = store
            .insert_batch(&[record("/r/a.txt", 1), record("/r/a.txt", 1)])
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.row_count().unwrap(), 1);
    }

    #[test]
    fn test_empty_batch_commits() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("files.db"), 2).unwrap();
        assert_eq!(store.insert_batch(&[]).unwrap(), 0);
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("files.db");

        {
            let mut store = SqliteStore::open(&db, 2).unwrap();
            store.insert_batch(&[record("/r/a.txt", 1)]).unwrap();
        }

        let store = SqliteStore::open(&db, 2).unwrap();
        assert_eq!(store.row_count().unwrap(), 1);
        assert_eq!(store.path(), db.as_path());
        assert_eq!(store.tag_count(), 2);
        assert!(SqliteStore::open(&db, 4).is_err());
    }

    #[test]
    fn test_open_existing_reads_tag_count() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("files.db");
        SqliteStore::open(&db, 5).unwrap();

        let store = SqliteStore::open_existing(&db).unwrap();
        assert_eq!(store.tag_count(), 5);
    }

    #[test]
    fn test_open_existing_never_creates_a_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.db");

        assert!(matches!(
            SqliteStore::open_existing(&missing),
            Err(StoreError::Sqlite(_))
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn test_open_existing_rejects_database_without_table() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("empty.db");
        Connection::open(&db)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER)")
            .unwrap();

        assert!(matches!(
            SqliteStore::open_existing(&db),
            Err(StoreError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_oversized_file_rejects_whole_batch() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("files.db"), 2).unwrap();

        let err = store
            .insert_batch(&[record("/r/ok.txt", 1), record("/r/huge.txt", u64::MAX)])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeOutOfRange { ref path, size: u64::MAX } if path == "/r/huge.txt"
        ));
        assert_eq!(store.row_count().unwrap(), 0);
    }
}
