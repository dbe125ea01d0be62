//! Page (document) record.

use crate::model::node::{Edge, Node, NodeId};
use serde::{Deserialize, Serialize};

/// Workspace-scoped page identifier allocated from a monotonic counter.
pub type PageId = u64;

/// Name used when a page record has none.
pub const UNTITLED_PAGE_NAME: &str = "Untitled";

/// One independent forest of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    #[serde(default = "default_page_name")]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Page {
    /// Creates an empty page.
    pub fn new(id: PageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// First node explicitly flagged as a root, in insertion order.
    pub fn flagged_root(&self) -> Option<&Node> {
        self.nodes.iter().find(|node| node.is_root)
    }
}

fn default_page_name() -> String {
    UNTITLED_PAGE_NAME.to_string()
}
