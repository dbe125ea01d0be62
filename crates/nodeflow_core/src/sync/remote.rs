//! Remote authority contract and in-process implementation.
//!
//! # Responsibility
//! - Define the keyed upsert/read interface the sync layer replicates to.
//! - Keep "record not found" distinct from transport failure.
//!
//! # Invariants
//! - `upsert` replaces the whole record (last writer wins).
//! - `updated_at` is assigned by the remote side, never by the caller.
//! - `fetch` of an unknown key is `Ok(None)`, not an error.

use crate::db::DbError;
use crate::model::snapshot::WorkspaceSnapshot;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// One replicated workspace record.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub id: String,
    pub data: WorkspaceSnapshot,
    /// Epoch ms assigned by the remote on write.
    pub updated_at: i64,
}

/// Remote-side failures. None of them are fatal to the engine.
#[derive(Debug)]
pub enum RemoteError {
    /// The remote link is not configured or currently unreachable.
    Unavailable,
    /// Request reached the remote but failed.
    Transport(String),
    /// Stored record could not be decoded.
    InvalidRecord(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "remote store unavailable"),
            Self::Transport(message) => write!(f, "remote transport failure: {message}"),
            Self::InvalidRecord(message) => write!(f, "invalid remote record: {message}"),
        }
    }
}

impl Error for RemoteError {}

impl From<rusqlite::Error> for RemoteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<DbError> for RemoteError {
    fn from(value: DbError) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRecord(value.to_string())
    }
}

impl RemoteError {
    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Transport(_) => "transport",
            Self::InvalidRecord(_) => "invalid_record",
        }
    }
}

/// Keyed record store acting as the remote authority.
pub trait RemoteStore {
    /// Whether a remote link exists at all. Checked before each drain.
    fn is_available(&self) -> bool {
        true
    }

    /// Replaces the record under `key` and returns the remote timestamp.
    fn upsert(&self, key: &str, snapshot: &WorkspaceSnapshot) -> RemoteResult<i64>;

    /// Reads the record under `key`.
    fn fetch(&self, key: &str) -> RemoteResult<Option<RemoteRecord>>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn upsert(&self, key: &str, snapshot: &WorkspaceSnapshot) -> RemoteResult<i64> {
        (**self).upsert(key, snapshot)
    }

    fn fetch(&self, key: &str) -> RemoteResult<Option<RemoteRecord>> {
        (**self).fetch(key)
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn upsert(&self, key: &str, snapshot: &WorkspaceSnapshot) -> RemoteResult<i64> {
        (**self).upsert(key, snapshot)
    }

    fn fetch(&self, key: &str) -> RemoteResult<Option<RemoteRecord>> {
        (**self).fetch(key)
    }
}

/// Remote used when no link is configured. Every call reports `Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteStore for NoRemote {
    fn is_available(&self) -> bool {
        false
    }

    fn upsert(&self, _key: &str, _snapshot: &WorkspaceSnapshot) -> RemoteResult<i64> {
        Err(RemoteError::Unavailable)
    }

    fn fetch(&self, _key: &str) -> RemoteResult<Option<RemoteRecord>> {
        Err(RemoteError::Unavailable)
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    records: BTreeMap<String, RemoteRecord>,
    upsert_count: usize,
    fail_upserts: bool,
    unavailable: bool,
    last_timestamp: i64,
}

/// Process-local remote with failure injection.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent upserts fail with a transport error.
    pub fn set_fail_upserts(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_upserts = fail;
        }
    }

    /// Toggles `is_available`.
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = !available;
        }
    }

    /// Number of upserts that reached the remote, failed ones included.
    pub fn upsert_count(&self) -> usize {
        self.state.lock().map(|state| state.upsert_count).unwrap_or(0)
    }

    /// Seeds a record directly, bypassing counters and failure injection.
    pub fn seed(&self, key: &str, snapshot: WorkspaceSnapshot) {
        if let Ok(mut state) = self.state.lock() {
            let updated_at = next_timestamp(&mut state);
            state.records.insert(
                key.to_string(),
                RemoteRecord {
                    id: key.to_string(),
                    data: snapshot,
                    updated_at,
                },
            );
        }
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Transport("remote state lock poisoned".to_string()))
    }
}

impl RemoteStore for InMemoryRemote {
    fn is_available(&self) -> bool {
        self.state
            .lock()
            .map(|state| !state.unavailable)
            .unwrap_or(false)
    }

    fn upsert(&self, key: &str, snapshot: &WorkspaceSnapshot) -> RemoteResult<i64> {
        let mut state = self.lock()?;
        if state.unavailable {
            return Err(RemoteError::Unavailable);
        }
        state.upsert_count += 1;
        if state.fail_upserts {
            return Err(RemoteError::Transport("injected upsert failure".to_string()));
        }
        let updated_at = next_timestamp(&mut state);
        state.records.insert(
            key.to_string(),
            RemoteRecord {
                id: key.to_string(),
                data: snapshot.clone(),
                updated_at,
            },
        );
        Ok(updated_at)
    }

    fn fetch(&self, key: &str) -> RemoteResult<Option<RemoteRecord>> {
        let state = self.lock()?;
        if state.unavailable {
            return Err(RemoteError::Unavailable);
        }
        Ok(state.records.get(key).cloned())
    }
}

/// Wall-clock epoch ms, forced strictly increasing per remote.
fn next_timestamp(state: &mut InMemoryState) -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    state.last_timestamp = now.max(state.last_timestamp + 1);
    state.last_timestamp
}

#[cfg(test)]
mod tests {
    use super::{InMemoryRemote, NoRemote, RemoteError, RemoteStore};
    use crate::model::snapshot::WorkspaceSnapshot;

    #[test]
    fn fetch_unknown_key_is_none() {
        let remote = InMemoryRemote::new();
        assert!(remote.fetch("default").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_record_with_increasing_timestamps() {
        let remote = InMemoryRemote::new();
        let first = remote.upsert("default", &WorkspaceSnapshot::default()).unwrap();
        let mut changed = WorkspaceSnapshot::default();
        changed.next_node_id = 9;
        let second = remote.upsert("default", &changed).unwrap();

        assert!(second > first);
        let record = remote.fetch("default").unwrap().expect("record should exist");
        assert_eq!(record.data.next_node_id, 9);
        assert_eq!(record.updated_at, second);
        assert_eq!(remote.upsert_count(), 2);
    }

    #[test]
    fn injected_failures_keep_previous_record() {
        let remote = InMemoryRemote::new();
        remote.upsert("default", &WorkspaceSnapshot::default()).unwrap();
        remote.set_fail_upserts(true);

        let mut changed = WorkspaceSnapshot::default();
        changed.next_page_id = 5;
        let err = remote.upsert("default", &changed).unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
        assert_eq!(remote.fetch("default").unwrap().unwrap().data.next_page_id, 1);
    }

    #[test]
    fn unavailable_remote_rejects_calls() {
        let remote = InMemoryRemote::new();
        remote.set_available(false);
        assert!(!remote.is_available());
        assert!(matches!(
            remote.fetch("default"),
            Err(RemoteError::Unavailable)
        ));
        assert!(!NoRemote.is_available());
    }
}
