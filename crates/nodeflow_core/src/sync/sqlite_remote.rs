//! Remote authority backed by a shared SQLite file.
//!
//! The `remote_records` table lives in its own database file (or an
//! in-memory connection in tests) opened through `db::open_db`.

use crate::db::ensure_migrated;
use crate::model::snapshot::WorkspaceSnapshot;
use crate::sync::remote::{RemoteRecord, RemoteResult, RemoteStore};
use rusqlite::{params, Connection, OptionalExtension};

/// `RemoteStore` over the `remote_records` table.
pub struct SqliteRemoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRemoteStore<'conn> {
    /// Creates a remote from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RemoteResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }
}

impl RemoteStore for SqliteRemoteStore<'_> {
    fn upsert(&self, key: &str, snapshot: &WorkspaceSnapshot) -> RemoteResult<i64> {
        let data = serde_json::to_string(snapshot)?;
        let updated_at: i64 = self.conn.query_row(
            "INSERT INTO remote_records (id, data, updated_at)
             VALUES (?1, ?2, CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             ON CONFLICT(id) DO UPDATE SET
                 data = excluded.data,
                 updated_at = MAX(excluded.updated_at, remote_records.updated_at + 1)
             RETURNING updated_at;",
            params![key, data],
            |row| row.get(0),
        )?;
        Ok(updated_at)
    }

    fn fetch(&self, key: &str) -> RemoteResult<Option<RemoteRecord>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT data, updated_at FROM remote_records WHERE id = ?1;",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((data, updated_at)) => Ok(Some(RemoteRecord {
                id: key.to_string(),
                data: serde_json::from_str(&data)?,
                updated_at,
            })),
            None => Ok(None),
        }
    }
}
