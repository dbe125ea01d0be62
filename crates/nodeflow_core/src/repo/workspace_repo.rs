//! Local durable store for the workspace record and its auxiliary logs.
//!
//! # Responsibility
//! - Persist one workspace snapshot per workspace key.
//! - Maintain the append-only pending-change log and the bounded history ring.
//!
//! # Invariants
//! - `save_snapshot` is a single upsert statement: an interrupted write leaves
//!   the previous record readable.
//! - Pending entries are never mutated; they are appended or removed by id.
//! - Drain order is insertion order (`id ASC`). Rows that no longer decode
//!   are reported by id so replication can clear them with the rest.
//! - After `push_history_snapshot`, at most `history_capacity` entries remain;
//!   the oldest are evicted first.

use crate::db::{ensure_migrated, DbError};
use crate::model::snapshot::WorkspaceSnapshot;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned id of a pending-change entry.
pub type PendingChangeId = i64;

/// Store-assigned id of a history snapshot entry.
pub type HistorySnapshotId = i64;

/// Default ring size for history snapshots.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from local store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite error, or a connection at the wrong schema version.
    Db(DbError),
    /// Snapshot could not be encoded or decoded.
    Serde(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serde(err) => write!(f, "invalid workspace payload: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serde(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Snapshot waiting for remote replication.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub id: PendingChangeId,
    pub payload: WorkspaceSnapshot,
    /// Epoch ms at enqueue time.
    pub timestamp: i64,
}

/// Everything currently in the pending-change log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingDrain {
    /// Decodable entries, oldest first.
    pub entries: Vec<PendingChange>,
    /// Rows whose payload failed to decode, oldest first.
    pub corrupt_ids: Vec<PendingChangeId>,
}

impl PendingDrain {
    /// Number of rows in the log, corrupt ones included.
    pub fn len(&self) -> usize {
        self.entries.len() + self.corrupt_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.corrupt_ids.is_empty()
    }

    /// Ids of every row, corrupt ones included, in ascending order.
    pub fn all_ids(&self) -> Vec<PendingChangeId> {
        let mut ids: Vec<PendingChangeId> = self
            .entries
            .iter()
            .map(|entry| entry.id)
            .chain(self.corrupt_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Newest decodable entry, unless a corrupt row was written after it.
    pub fn latest_valid(&self) -> Option<&PendingChange> {
        let latest = self.entries.last()?;
        match self.corrupt_ids.last() {
            Some(corrupt) if *corrupt > latest.id => None,
            _ => Some(latest),
        }
    }
}

/// Point-in-time copy kept in the history ring.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub id: HistorySnapshotId,
    pub payload: WorkspaceSnapshot,
    /// Epoch ms at capture time.
    pub timestamp: i64,
}

/// Repository interface for the local durable store.
pub trait WorkspaceRepository {
    /// Overwrites the persisted workspace record.
    fn save_snapshot(&self, snapshot: &WorkspaceSnapshot) -> StoreResult<()>;
    /// Loads the persisted workspace record, if any.
    fn load_snapshot(&self) -> StoreResult<Option<WorkspaceSnapshot>>;
    /// Appends one entry to the pending-change log.
    fn enqueue_pending_change(&self, snapshot: &WorkspaceSnapshot)
        -> StoreResult<PendingChangeId>;
    /// Reads the whole pending log in insertion order without removing it.
    fn drain_pending_changes(&self) -> StoreResult<PendingDrain>;
    /// Removes one pending entry by id. Unknown ids are ignored.
    fn clear_pending_change(&self, id: PendingChangeId) -> StoreResult<()>;
    /// Appends to the history ring and evicts the oldest excess entries.
    fn push_history_snapshot(&self, snapshot: &WorkspaceSnapshot)
        -> StoreResult<HistorySnapshotId>;
    /// Lists history entries oldest first. Undecodable rows are skipped.
    fn list_history(&self) -> StoreResult<Vec<HistorySnapshot>>;
}

impl<T: WorkspaceRepository + ?Sized> WorkspaceRepository for &T {
    fn save_snapshot(&self, snapshot: &WorkspaceSnapshot) -> StoreResult<()> {
        (**self).save_snapshot(snapshot)
    }

    fn load_snapshot(&self) -> StoreResult<Option<WorkspaceSnapshot>> {
        (**self).load_snapshot()
    }

    fn enqueue_pending_change(
        &self,
        snapshot: &WorkspaceSnapshot,
    ) -> StoreResult<PendingChangeId> {
        (**self).enqueue_pending_change(snapshot)
    }

    fn drain_pending_changes(&self) -> StoreResult<PendingDrain> {
        (**self).drain_pending_changes()
    }

    fn clear_pending_change(&self, id: PendingChangeId) -> StoreResult<()> {
        (**self).clear_pending_change(id)
    }

    fn push_history_snapshot(
        &self,
        snapshot: &WorkspaceSnapshot,
    ) -> StoreResult<HistorySnapshotId> {
        (**self).push_history_snapshot(snapshot)
    }

    fn list_history(&self) -> StoreResult<Vec<HistorySnapshot>> {
        (**self).list_history()
    }
}

/// SQLite-backed local store scoped to one workspace key.
pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
    workspace_key: String,
    history_capacity: usize,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection, workspace_key: impl Into<String>) -> StoreResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self {
            conn,
            workspace_key: workspace_key.into(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        })
    }

    /// Overrides the history ring size. Values below one are raised to one.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    pub fn workspace_key(&self) -> &str {
        &self.workspace_key
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn save_snapshot(&self, snapshot: &WorkspaceSnapshot) -> StoreResult<()> {
        let data = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO workspace_records (id, data, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(id) DO UPDATE SET
                 data = excluded.data,
                 updated_at = excluded.updated_at;",
            params![self.workspace_key, data],
        )?;
        Ok(())
    }

    fn load_snapshot(&self) -> StoreResult<Option<WorkspaceSnapshot>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM workspace_records WHERE id = ?1;",
                [self.workspace_key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn enqueue_pending_change(
        &self,
        snapshot: &WorkspaceSnapshot,
    ) -> StoreResult<PendingChangeId> {
        let payload = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO pending_changes (workspace_id, payload) VALUES (?1, ?2);",
            params![self.workspace_key, payload],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn drain_pending_changes(&self) -> StoreResult<PendingDrain> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload, created_at
             FROM pending_changes
             WHERE workspace_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([self.workspace_key.as_str()])?;
        let mut drain = PendingDrain::default();
        while let Some(row) = rows.next()? {
            let id: PendingChangeId = row.get(0)?;
            let payload: String = row.get(1)?;
            match serde_json::from_str(&payload) {
                Ok(payload) => drain.entries.push(PendingChange {
                    id,
                    payload,
                    timestamp: row.get(2)?,
                }),
                Err(err) => {
                    warn!("event=pending_drain module=repo status=skipped entry_id={id} error={err}");
                    drain.corrupt_ids.push(id);
                }
            }
        }
        Ok(drain)
    }

    fn clear_pending_change(&self, id: PendingChangeId) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM pending_changes WHERE id = ?1 AND workspace_id = ?2;",
            params![id, self.workspace_key],
        )?;
        Ok(())
    }

    fn push_history_snapshot(
        &self,
        snapshot: &WorkspaceSnapshot,
    ) -> StoreResult<HistorySnapshotId> {
        let payload = serde_json::to_string(snapshot)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO history_snapshots (workspace_id, payload) VALUES (?1, ?2);",
            params![self.workspace_key, payload],
        )?;
        let id = tx.last_insert_rowid();
        let capacity = i64::try_from(self.history_capacity).unwrap_or(i64::MAX);
        tx.execute(
            "DELETE FROM history_snapshots
             WHERE workspace_id = ?1
               AND id NOT IN (
                 SELECT id
                 FROM history_snapshots
                 WHERE workspace_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2
               );",
            params![self.workspace_key, capacity],
        )?;
        tx.commit()?;
        Ok(id)
    }

    fn list_history(&self) -> StoreResult<Vec<HistorySnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload, created_at
             FROM history_snapshots
             WHERE workspace_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([self.workspace_key.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let id: HistorySnapshotId = row.get(0)?;
            let payload: String = row.get(1)?;
            match serde_json::from_str(&payload) {
                Ok(payload) => items.push(HistorySnapshot {
                    id,
                    payload,
                    timestamp: row.get(2)?,
                }),
                Err(err) => warn!(
                    "event=history_list module=repo status=skipped entry_id={id} error={err}"
                ),
            }
        }
        Ok(items)
    }
}
