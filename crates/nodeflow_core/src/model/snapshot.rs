//! Persisted workspace snapshot schema.
//!
//! # Responsibility
//! - Define the single record shape written to the local store, the pending
//!   change log, history snapshots, remote upserts and JSON exports.
//! - Validate and repair a decoded record once, at load time.
//!
//! # Invariants
//! - After `normalize`, every edge references nodes of its own page, every
//!   node has at most one incoming edge, and counters sit strictly above every
//!   id in use.
//! - `schema_version` missing from a record means the pre-versioned format.

use crate::model::node::{Edge, NodeId};
use crate::model::page::{Page, PageId};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schema version written by this build.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;

/// Version assumed for records that predate the `schemaVersion` field.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Full workspace state as persisted and replicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub active_page_id: Option<PageId>,
    #[serde(default = "first_id")]
    pub next_node_id: NodeId,
    #[serde(default = "first_id")]
    pub next_page_id: PageId,
}

impl Default for WorkspaceSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            pages: Vec::new(),
            active_page_id: None,
            next_node_id: 1,
            next_page_id: 1,
        }
    }
}

/// Repairs applied by [`WorkspaceSnapshot::normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub dangling_edges: usize,
    pub extra_parent_edges: usize,
    /// Edges pointing into a flagged root.
    pub root_parent_edges: usize,
    pub duplicate_nodes: usize,
    pub counters_raised: bool,
    pub active_page_reset: bool,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl WorkspaceSnapshot {
    /// Returns whether the snapshot holds at least one page.
    pub fn has_pages(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Validates the decoded record and repairs structural damage in place.
    ///
    /// Pages with zero nodes are kept; the caller decides what an empty
    /// workspace (zero pages) falls back to.
    pub fn normalize(&mut self) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        let mut max_node_id: NodeId = 0;
        let mut max_page_id: PageId = 0;
        let mut seen_nodes: HashSet<NodeId> = HashSet::new();

        for page in &mut self.pages {
            max_page_id = max_page_id.max(page.id);

            let before = page.nodes.len();
            page.nodes.retain(|node| seen_nodes.insert(node.id));
            report.duplicate_nodes += before - page.nodes.len();

            let page_nodes: HashSet<NodeId> = page.nodes.iter().map(|node| node.id).collect();
            let flagged_roots: HashSet<NodeId> = page
                .nodes
                .iter()
                .filter(|node| node.is_root)
                .map(|node| node.id)
                .collect();
            if let Some(max) = page_nodes.iter().max() {
                max_node_id = max_node_id.max(*max);
            }

            let mut has_parent: HashSet<NodeId> = HashSet::new();
            let mut kept: Vec<Edge> = Vec::with_capacity(page.edges.len());
            for edge in page.edges.drain(..) {
                if !page_nodes.contains(&edge.from) || !page_nodes.contains(&edge.to) {
                    report.dangling_edges += 1;
                    continue;
                }
                if flagged_roots.contains(&edge.to) {
                    report.root_parent_edges += 1;
                    continue;
                }
                if !has_parent.insert(edge.to) {
                    report.extra_parent_edges += 1;
                    continue;
                }
                kept.push(edge);
            }
            page.edges = kept;
        }

        if self.next_node_id <= max_node_id {
            self.next_node_id = max_node_id + 1;
            report.counters_raised = true;
        }
        if self.next_page_id <= max_page_id {
            self.next_page_id = max_page_id + 1;
            report.counters_raised = true;
        }

        let active_is_valid = self
            .active_page_id
            .is_some_and(|id| self.pages.iter().any(|page| page.id == id));
        if !active_is_valid {
            let fallback = self.pages.first().map(|page| page.id);
            if self.active_page_id != fallback {
                report.active_page_reset = true;
            }
            self.active_page_id = fallback;
        }

        self.schema_version = SNAPSHOT_SCHEMA_VERSION;

        if !report.is_clean() {
            warn!(
                "event=snapshot_normalize module=model status=repaired dangling_edges={} extra_parent_edges={} root_parent_edges={} duplicate_nodes={} counters_raised={} active_page_reset={}",
                report.dangling_edges,
                report.extra_parent_edges,
                report.root_parent_edges,
                report.duplicate_nodes,
                report.counters_raised,
                report.active_page_reset
            );
        }
        report
    }
}

fn legacy_schema_version() -> u32 {
    LEGACY_SCHEMA_VERSION
}

fn first_id() -> u64 {
    1
}
