//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::{Connection, OptionalExtension};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the embedding dimension this database is bound to, if any.
pub fn get_embedding_dim(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'embedding_dim'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

/// Bind the database to an embedding dimension.
pub fn set_embedding_dim(conn: &Connection, dim: usize) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_dim', ?1)",
        [dim.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(
        schema_version = version,
        target = CURRENT_SCHEMA_VERSION,
        "checking migrations"
    );

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.unchecked_transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: rebuild `images` so ids are never reused, columns are
/// `NOT NULL`, and each row carries a `created_at` timestamp. The embedding
/// dimension of any existing rows is recorded in `schema_meta`.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE images_v2 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL CHECK(length(path) > 0),
            embedding BLOB NOT NULL,
            created_at TEXT
        );
        INSERT INTO images_v2 (id, path, embedding)
            SELECT id, path, embedding FROM images
            WHERE path IS NOT NULL AND length(path) > 0 AND embedding IS NOT NULL
            ORDER BY id;
        "#,
    )?;

    let legacy: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
    let kept: i64 = conn.query_row("SELECT COUNT(*) FROM images_v2", [], |row| row.get(0))?;
    if kept < legacy {
        tracing::warn!(dropped = legacy - kept, "dropped legacy rows without path or embedding");
    }

    conn.execute_batch(
        "DROP TABLE images;
         ALTER TABLE images_v2 RENAME TO images;",
    )?;

    let first_blob_len: Option<i64> = conn
        .query_row(
            "SELECT length(embedding) FROM images ORDER BY id LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(bytes) = first_blob_len {
        let dim = bytes as usize / std::mem::size_of::<f32>();
        set_embedding_dim(conn, dim)?;
        tracing::info!(dim, rows = kept, "recorded embedding dimension of legacy rows");
    }

    Ok(())
}
