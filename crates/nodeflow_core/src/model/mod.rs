//! Domain records for pages, nodes and workspace snapshots.
//!
//! # Responsibility
//! - Define the data shapes shared by graph, layout, storage and sync.
//! - Keep one serde schema for local records, remote records and exports.
//!
//! # Invariants
//! - Node and page ids are workspace-scoped integers that never collide.
//! - Optional persisted fields have documented defaults.

pub mod node;
pub mod page;
pub mod snapshot;
