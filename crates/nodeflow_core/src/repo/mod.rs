//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the local durable store contract.
//! - Isolate SQLite query details from session/sync orchestration.
//!
//! # Invariants
//! - Every persisted payload is a serialized `WorkspaceSnapshot`.
//! - Store failures surface as `StoreError`; callers decide whether they are
//!   fatal (the session never treats them as such).

pub mod legacy;
pub mod workspace_repo;
