//! Node and edge records.
//!
//! # Responsibility
//! - Define the canonical note node shared by graph, layout and storage.
//! - Provide forward-compatible serde defaults for persisted records.
//!
//! # Invariants
//! - `id` is unique within one workspace and never reused.
//! - `x`/`y` are owned by layout unless `manual_position` is set.

use serde::{Deserialize, Serialize};

/// Workspace-scoped node identifier allocated from a monotonic counter.
pub type NodeId = u64;

/// Color assigned to roots and to nodes created without a parent.
pub const DEFAULT_NODE_COLOR: &str = "#7c6fef";

/// Palette offered to callers for node recoloring.
pub const NODE_COLORS: [&str; 8] = [
    "#7c6fef", "#ef6f8a", "#6fefb2", "#efcf6f", "#6fb8ef", "#ef8f6f", "#b86fef", "#6fefd4",
];

/// Progress marker shown next to a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    None,
    Todo,
    Doing,
    Done,
}

impl NodeStatus {
    /// Stable lowercase name, matching the persisted form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// Parses the persisted name; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "todo" => Some(Self::Todo),
            "doing" => Some(Self::Doing),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// One note in a page tree.
///
/// Optional fields carry serde defaults so records written by older builds
/// (or hand-edited exports) still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub manual_position: bool,
}

impl Node {
    /// Creates a node with default metadata at the given coordinates.
    pub fn new(id: NodeId, label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            label: label.into(),
            x,
            y,
            is_root: false,
            color: default_color(),
            notes: String::new(),
            status: NodeStatus::None,
            collapsed: false,
            manual_position: false,
        }
    }
}

/// Directed parent -> child link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    /// Returns whether either endpoint is `id`.
    pub fn touches(&self, id: NodeId) -> bool {
        self.from == id || self.to == id
    }
}

fn default_color() -> String {
    DEFAULT_NODE_COLOR.to_string()
}
