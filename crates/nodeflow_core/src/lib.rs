//! Core engine for NodeFlow radial note maps.
//! This crate is the single source of truth for graph invariants, layout,
//! local persistence and remote sync.

pub mod config;
pub mod db;
pub mod graph;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod sync;

pub use config::{ConfigError, EngineConfig};
pub use graph::templates::{find_template, PageTemplate, TEMPLATES};
pub use graph::view::{Bounds, Direction, PageGraph, Point, Traversal};
pub use graph::workspace::Workspace;
pub use layout::{compute_radial_layout, layout_page, LayoutParams, RadialLayout};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::node::{Edge, Node, NodeId, NodeStatus};
pub use model::page::{Page, PageId};
pub use model::snapshot::WorkspaceSnapshot;
pub use repo::legacy::{LegacyJsonFile, LegacySource};
pub use repo::workspace_repo::{
    PendingDrain, SqliteWorkspaceRepository, StoreError, StoreResult, WorkspaceRepository,
};
pub use search::node_search::{search, SearchError, SearchHit};
pub use service::markdown_export::page_to_markdown;
pub use service::session::{BootSource, Session, TickReport};
pub use sync::coordinator::{SyncCoordinator, SyncOutcome, SyncStatus};
pub use sync::remote::{InMemoryRemote, NoRemote, RemoteError, RemoteRecord, RemoteStore};
pub use sync::sqlite_remote::SqliteRemoteStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
