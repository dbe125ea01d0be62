//! Replication of local state to the remote authority.
//!
//! # Responsibility
//! - `remote`: the remote store contract and in-process implementations.
//! - `sqlite_remote`: a SQLite-file remote.
//! - `coordinator`: pending-log drain state machine and sync status.
//! - `schedule`: debounce and periodic timers.

pub mod coordinator;
pub mod remote;
pub mod schedule;
pub mod sqlite_remote;
