//! Workspace context object and graph mutations.
//!
//! # Responsibility
//! - Own all pages, the active page id and both id counters.
//! - Apply node/page mutations atomically: every method either fully applies
//!   or leaves state untouched.
//!
//! # Invariants
//! - Node ids and page ids come from monotonic counters and are never reused.
//! - A node has at most one incoming edge; flagged roots have none.
//! - Structural violations (deleting a root, collapsing a leaf, unknown ids)
//!   are silent no-ops reported through the return value.
//! - Deleting the last page is rejected.

use crate::graph::templates::PageTemplate;
use crate::graph::view::{PageGraph, Point};
use crate::model::node::{Edge, Node, NodeId, NodeStatus, DEFAULT_NODE_COLOR};
use crate::model::page::{Page, PageId};
use crate::model::snapshot::{WorkspaceSnapshot, SNAPSHOT_SCHEMA_VERSION};
use log::{debug, info};
use std::collections::HashSet;

/// Name of the page created when a workspace would otherwise be empty.
pub const DEFAULT_PAGE_NAME: &str = "My Notes";

/// Name given to pages added without one.
pub const NEW_PAGE_NAME: &str = "New Page";

/// In-memory workspace state.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pages: Vec<Page>,
    active_page_id: Option<PageId>,
    next_node_id: NodeId,
    next_page_id: PageId,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Creates a workspace with no pages.
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            active_page_id: None,
            next_node_id: 1,
            next_page_id: 1,
        }
    }

    /// Creates a workspace holding one default page with its root node.
    pub fn with_default_page() -> Self {
        let mut workspace = Self::new();
        workspace.add_page(Some(DEFAULT_PAGE_NAME), Point::ORIGIN);
        workspace
    }

    /// Builds a workspace from a persisted snapshot.
    ///
    /// The snapshot is normalized first. A snapshot with zero pages falls back
    /// to a fresh default page.
    pub fn from_snapshot(mut snapshot: WorkspaceSnapshot) -> Self {
        snapshot.normalize();
        let mut workspace = Self {
            pages: snapshot.pages,
            active_page_id: snapshot.active_page_id,
            next_node_id: snapshot.next_node_id,
            next_page_id: snapshot.next_page_id,
        };
        if workspace.pages.is_empty() {
            info!("event=workspace_load module=graph status=empty fallback=default_page");
            workspace.add_page(Some(DEFAULT_PAGE_NAME), Point::ORIGIN);
        }
        workspace
    }

    /// Captures a consistent copy of the current state.
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            pages: self.pages.clone(),
            active_page_id: self.active_page_id,
            next_node_id: self.next_node_id,
            next_page_id: self.next_page_id,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == id)
    }

    pub fn active_page_id(&self) -> Option<PageId> {
        self.active_page_id
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.page(self.active_page_id?)
    }

    /// Mutable access for layout; structural edits go through workspace methods.
    pub fn active_page_mut(&mut self) -> Option<&mut Page> {
        let id = self.active_page_id?;
        self.pages.iter_mut().find(|page| page.id == id)
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    pub fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    /// Indexed query view over the active page.
    pub fn graph(&self) -> Option<PageGraph<'_>> {
        self.active_page().map(PageGraph::new)
    }

    /// Looks up a node on the active page.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.active_page()?.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.active_page_mut()?.node_mut(id)
    }

    /// Creates a node on the active page.
    ///
    /// With `parent`, one `parent -> id` edge is added and the color is
    /// inherited from the parent. Returns `None` when there is no active page,
    /// when `parent` is unknown, or when a flagged root is given a parent.
    pub fn create_node(
        &mut self,
        label: impl Into<String>,
        x: f64,
        y: f64,
        parent: Option<NodeId>,
        is_root: bool,
    ) -> Option<NodeId> {
        if is_root && parent.is_some() {
            return None;
        }
        let id = self.next_node_id;
        let page = self.active_page_mut()?;
        let color = match parent {
            Some(parent_id) => page.node(parent_id)?.color.clone(),
            None => DEFAULT_NODE_COLOR.to_string(),
        };

        let mut node = Node::new(id, label, x, y);
        node.is_root = is_root;
        node.color = color;
        page.nodes.push(node);
        if let Some(parent_id) = parent {
            page.edges.push(Edge::new(parent_id, id));
        }
        self.next_node_id += 1;

        debug!(
            "event=node_create module=graph status=ok node_id={id} has_parent={} is_root={is_root}",
            parent.is_some()
        );
        Some(id)
    }

    /// Adds an empty child at the parent's position, expanding the parent if
    /// it was collapsed.
    pub fn add_child(&mut self, parent: NodeId) -> Option<NodeId> {
        let (x, y) = {
            let node = self.node_mut(parent)?;
            node.collapsed = false;
            (node.x, node.y)
        };
        self.create_node("", x, y, Some(parent), false)
    }

    /// Deletes `id` and its whole descendant subtree.
    ///
    /// Returns removed ids in breadth-first order; empty when `id` is a flagged
    /// root, unknown, or there is no active page.
    pub fn delete_node(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(page) = self.active_page_mut() else {
            return Vec::new();
        };
        match page.node(id) {
            Some(node) if !node.is_root => {}
            _ => return Vec::new(),
        }

        let removed = PageGraph::new(page).descendants_inclusive(id);
        let doomed: HashSet<NodeId> = removed.iter().copied().collect();
        let nodes: Vec<Node> = page
            .nodes
            .iter()
            .filter(|node| !doomed.contains(&node.id))
            .cloned()
            .collect();
        let edges: Vec<Edge> = page
            .edges
            .iter()
            .filter(|edge| !doomed.contains(&edge.from) && !doomed.contains(&edge.to))
            .copied()
            .collect();
        page.nodes = nodes;
        page.edges = edges;

        info!(
            "event=node_delete module=graph status=ok node_id={id} removed={}",
            removed.len()
        );
        removed
    }

    /// Flips `collapsed` on a node with at least one child.
    pub fn toggle_collapse(&mut self, id: NodeId) -> bool {
        let has_children = match self.graph() {
            Some(graph) => graph.contains(id) && !graph.child_ids(id).is_empty(),
            None => false,
        };
        if !has_children {
            return false;
        }
        match self.node_mut(id) {
            Some(node) => {
                node.collapsed = !node.collapsed;
                true
            }
            None => false,
        }
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> bool {
        self.update_node(id, |node| node.label = label.into())
    }

    pub fn set_notes(&mut self, id: NodeId, notes: impl Into<String>) -> bool {
        self.update_node(id, |node| node.notes = notes.into())
    }

    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) -> bool {
        self.update_node(id, |node| node.status = status)
    }

    pub fn set_color(&mut self, id: NodeId, color: impl Into<String>) -> bool {
        self.update_node(id, |node| node.color = color.into())
    }

    /// Pins a node at user-chosen coordinates; layout will not move it.
    pub fn move_node_to(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        self.update_node(id, |node| {
            node.x = x;
            node.y = y;
            node.manual_position = true;
        })
    }

    /// Clears every manual pin on the active page. Returns how many changed.
    pub fn reset_manual_positions(&mut self) -> usize {
        let Some(page) = self.active_page_mut() else {
            return 0;
        };
        let mut changed = 0;
        for node in page.nodes.iter_mut().filter(|node| node.manual_position) {
            node.manual_position = false;
            changed += 1;
        }
        changed
    }

    fn update_node(&mut self, id: NodeId, apply: impl FnOnce(&mut Node)) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                apply(node);
                true
            }
            None => false,
        }
    }

    /// Adds a page with a root node named after it and makes it active.
    pub fn add_page(&mut self, name: Option<&str>, center: Point) -> PageId {
        let name = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(NEW_PAGE_NAME)
            .to_string();
        let id = self.push_page(name.clone());
        self.create_node(name, center.x, center.y, None, true);
        id
    }

    /// Adds a page populated from a template and makes it active.
    pub fn add_page_from_template(&mut self, template: &PageTemplate, center: Point) -> PageId {
        let id = self.push_page(template.name.to_string());
        template.build(self, center);
        id
    }

    fn push_page(&mut self, name: String) -> PageId {
        let id = self.next_page_id;
        self.next_page_id += 1;
        self.pages.push(Page::new(id, name));
        self.active_page_id = Some(id);
        info!("event=page_add module=graph status=ok page_id={id}");
        id
    }

    /// Makes `id` the active page. Unknown ids are ignored.
    pub fn switch_page(&mut self, id: PageId) -> bool {
        if self.page(id).is_none() {
            return false;
        }
        self.active_page_id = Some(id);
        true
    }

    /// Removes a page unless it is the last one.
    ///
    /// When the active page is removed, the first remaining page becomes active.
    pub fn delete_page(&mut self, id: PageId) -> bool {
        if self.pages.len() <= 1 || self.page(id).is_none() {
            return false;
        }
        self.pages.retain(|page| page.id != id);
        if self.active_page_id == Some(id) {
            self.active_page_id = self.pages.first().map(|page| page.id);
        }
        info!("event=page_delete module=graph status=ok page_id={id}");
        true
    }

    /// Renames a page and relabels its flagged root.
    pub fn rename_page(&mut self, id: PageId, name: impl Into<String>) -> bool {
        let Some(page) = self.pages.iter_mut().find(|page| page.id == id) else {
            return false;
        };
        let name = name.into();
        if let Some(root) = page.nodes.iter_mut().find(|node| node.is_root) {
            root.label = name.clone();
        }
        page.name = name;
        true
    }

    /// Removes every node of the active page and recreates its root.
    pub fn clear_page(&mut self, center: Point) -> bool {
        let Some(page) = self.active_page_mut() else {
            return false;
        };
        page.nodes.clear();
        page.edges.clear();
        let name = page.name.clone();
        self.create_node(name, center.x, center.y, None, true)
            .is_some()
    }
}
