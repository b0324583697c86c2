//! Durable, append-only embedding table.
//!
//! [`EmbeddingStore`] owns the SQLite connection. Every operation runs as one
//! transaction while holding the connection lock, so writers never interleave
//! and each read observes a single snapshot of the table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::catalog::types::ImageRecord;
use crate::catalog::{bytes_to_embedding, embedding_to_bytes};
use crate::db;
use crate::error::{Error, Result};

/// Raw `images` row before the embedding blob is decoded.
type RawRow = (i64, String, Vec<u8>, Option<String>);

const SELECT_COLUMNS: &str = "SELECT id, path, embedding, created_at FROM images";

/// Handle to the persisted image table, bound to one embedding dimension.
#[derive(Debug)]
pub struct EmbeddingStore {
    conn: Mutex<Connection>,
    dim: usize,
}

impl EmbeddingStore {
    /// Open (or create) the store at `path`, bound to vectors of length `dim`.
    ///
    /// Fails if the database was previously bound to a different dimension.
    pub fn open(path: impl AsRef<Path>, dim: usize) -> anyhow::Result<Self> {
        let conn = db::open_database(path)?;
        Ok(Self::bind(conn, dim)?)
    }

    /// Open a fresh in-memory store. Used by tests and throwaway runs.
    pub fn open_in_memory(dim: usize) -> anyhow::Result<Self> {
        let conn = db::open_memory_database()?;
        Ok(Self::bind(conn, dim)?)
    }

    fn bind(conn: Connection, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidInput("embedding dimension must be non-zero".into()));
        }
        match db::migrations::get_embedding_dim(&conn)? {
            Some(stored) if stored != dim => {
                return Err(Error::DimensionMismatch {
                    expected: stored,
                    actual: dim,
                });
            }
            Some(_) => {}
            None => db::migrations::set_embedding_dim(&conn, dim)?,
        }
        tracing::debug!(dim, "embedding store bound");
        Ok(Self {
            conn: Mutex::new(conn),
            dim,
        })
    }

    /// The vector length every record in this store has.
    pub fn dimensions(&self) -> usize {
        self.dim
    }

    /// A panic while holding the lock leaves no half-applied write behind: the
    /// open transaction is rolled back when dropped. So a poisoned lock is safe
    /// to reuse.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check that `embedding` has the store's dimension.
    pub fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Append a record and return its id.
    pub fn insert(&self, path: &str, embedding: &[f32]) -> Result<i64> {
        if path.is_empty() {
            return Err(Error::InvalidInput("image path must not be empty".into()));
        }
        self.check_dimensions(embedding)?;
        if let Some(pos) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "embedding component {pos} is not finite"
            )));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let id = insert_image(&tx, path, embedding)?;
        tx.commit()?;

        tracing::debug!(id, path, "image stored");
        Ok(id)
    }

    /// All records in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<ImageRecord>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let rows = select_rows(&tx, usize::MAX, 0)?;
        tx.commit()?;
        drop(conn);

        self.decode_rows(rows)
    }

    /// Look up one record by id.
    pub fn get(&self, id: i64) -> Result<ImageRecord> {
        let conn = self.lock();
        let row: Option<RawRow> = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        drop(conn);

        match row {
            Some(row) => self.decode_row(row),
            None => Err(Error::NotFound { id }),
        }
    }

    /// Remove every record. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM images", [])?;
        tx.commit()?;

        tracing::info!(removed, "image store cleared");
        Ok(removed)
    }

    /// Total number of records.
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock();
        Ok(count_rows(&conn)?)
    }

    /// Up to `limit` records starting at `offset` (insertion order), together
    /// with the total record count observed in the same transaction.
    pub fn page_slice(&self, offset: usize, limit: usize) -> Result<(Vec<ImageRecord>, u64)> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let total = count_rows(&tx)?;
        let rows = select_rows(&tx, limit, offset)?;
        tx.commit()?;
        drop(conn);

        Ok((self.decode_rows(rows)?, total))
    }

    fn decode_rows(&self, rows: Vec<RawRow>) -> Result<Vec<ImageRecord>> {
        rows.into_iter().map(|row| self.decode_row(row)).collect()
    }

    fn decode_row(&self, (id, path, blob, created_at): RawRow) -> Result<ImageRecord> {
        let embedding = bytes_to_embedding(&blob)
            .filter(|v| v.len() == self.dim)
            .ok_or(Error::CorruptRecord {
                id,
                bytes: blob.len(),
            })?;
        Ok(ImageRecord {
            id,
            path,
            embedding,
            created_at,
        })
    }
}

fn insert_image(tx: &Transaction, path: &str, embedding: &[f32]) -> rusqlite::Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO images (path, embedding, created_at) VALUES (?1, ?2, ?3)",
        params![path, embedding_to_bytes(embedding), now],
    )?;
    Ok(tx.last_insert_rowid())
}

fn count_rows(conn: &Connection) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// `LIMIT`/`OFFSET` are clamped to SQLite's signed 64-bit range.
fn select_rows(conn: &Connection, limit: usize, offset: usize) -> rusqlite::Result<Vec<RawRow>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} ORDER BY id LIMIT ?1 OFFSET ?2"
    ))?;
    let rows = stmt
        .query_map(params![limit, offset], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn insert_assigns_ascending_ids() {
        let store = EmbeddingStore::open_in_memory(4).unwrap();
        let a = store.insert("a.jpg", &unit(4, 0)).unwrap();
        let b = store.insert("b.jpg", &unit(4, 1)).unwrap();
        assert!(b > a);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn insert_rejects_wrong_dimension() {
        let store = EmbeddingStore::open_in_memory(4).unwrap();
        let err = store.insert("a.jpg", &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn insert_rejects_empty_path_and_nan() {
        let store = EmbeddingStore::open_in_memory(2).unwrap();
        assert!(matches!(
            store.insert("", &[1.0, 0.0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("x.png", &[f32::NAN, 0.0]),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = EmbeddingStore::open_in_memory(2).unwrap();
        assert!(matches!(store.get(42), Err(Error::NotFound { id: 42 })));
    }

    #[test]
    fn get_returns_stored_record() {
        let store = EmbeddingStore::open_in_memory(3).unwrap();
        let id = store.insert("cat.webp", &[0.5, -0.25, 2.0]).unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.path, "cat.webp");
        assert_eq!(record.embedding, vec![0.5, -0.25, 2.0]);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn clear_empty_store_returns_zero() {
        let store = EmbeddingStore::open_in_memory(2).unwrap();
        assert_eq!(store.clear().unwrap(), 0);
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn ids_not_reused_after_clear() {
        let store = EmbeddingStore::open_in_memory(2).unwrap();
        let first = store.insert("a.jpg", &[1.0, 0.0]).unwrap();
        assert_eq!(store.clear().unwrap(), 1);
        let second = store.insert("b.jpg", &[1.0, 0.0]).unwrap();
        assert!(second > first);
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let store = EmbeddingStore::open_in_memory(2).unwrap();
        {
            let conn = store.lock();
            conn.execute(
                "INSERT INTO images (path, embedding) VALUES ('bad.png', x'0000803f')",
                [],
            )
            .unwrap();
        }
        assert!(matches!(
            store.fetch_all(),
            Err(Error::CorruptRecord { bytes: 4, .. })
        ));
    }

    #[test]
    fn page_slice_reports_total() {
        let store = EmbeddingStore::open_in_memory(1).unwrap();
        for i in 0..4 {
            store.insert(&format!("{i}.png"), &[i as f32]).unwrap();
        }
        let (records, total) = store.page_slice(1, 2).unwrap();
        assert_eq!(total, 4);
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["1.png", "2.png"]);
    }
}
