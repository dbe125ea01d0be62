//! Read-only graph queries over one page.
//!
//! # Responsibility
//! - Index a page's edges once and answer parent/child/visibility queries.
//! - Stay pure: no query mutates the page.
//!
//! # Invariants
//! - Child order follows edge insertion order, so every query is deterministic.
//! - Upward walks stop after [`MAX_TRAVERSAL_STEPS`] and report truncation;
//!   cycles in corrupted data never hang a query.

use crate::model::node::{Edge, Node, NodeId};
use crate::model::page::Page;
use log::warn;
use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

/// Safety valve for upward walks (ancestor path, depth).
///
/// This is not a semantic depth limit. Results that hit it carry
/// `truncated = true`.
pub const MAX_TRAVERSAL_STEPS: usize = 64;

/// Result of a capped walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal<T> {
    pub value: T,
    /// `true` when the walk stopped at the step cap or on a cycle.
    pub truncated: bool,
}

/// 2-D point in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

/// Screen direction for neighbour navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    /// Angle in radians with +y pointing down.
    pub fn angle(self) -> f64 {
        match self {
            Self::Right => 0.0,
            Self::Down => PI / 2.0,
            Self::Left => PI,
            Self::Up => -PI / 2.0,
        }
    }
}

/// Weight of angular deviation against distance when picking a neighbour.
const DIRECTION_ANGLE_WEIGHT: f64 = 300.0;

/// Indexed view of one page.
pub struct PageGraph<'a> {
    page: &'a Page,
    index: HashMap<NodeId, usize>,
    children: HashMap<NodeId, Vec<NodeId>>,
    parents: HashMap<NodeId, NodeId>,
}

impl<'a> PageGraph<'a> {
    pub fn new(page: &'a Page) -> Self {
        let index = page
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id, position))
            .collect::<HashMap<_, _>>();

        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
        for edge in &page.edges {
            parents.entry(edge.to).or_insert(edge.from);
            if index.contains_key(&edge.to) {
                children.entry(edge.from).or_default().push(edge.to);
            }
        }

        Self {
            page,
            index,
            children,
            parents,
        }
    }

    pub fn page(&self) -> &'a Page {
        self.page
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.index.get(&id).map(|position| &self.page.nodes[*position])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids of existing children, in edge order.
    pub fn child_ids(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Existing child nodes, in edge order.
    pub fn children_of(&self, id: NodeId) -> Vec<&'a Node> {
        self.child_ids(id)
            .iter()
            .filter_map(|child| self.node(*child))
            .collect()
    }

    /// The unique predecessor of `id`, if any.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Nodes with no incoming edge, in node order.
    pub fn roots(&self) -> Vec<&'a Node> {
        self.page
            .nodes
            .iter()
            .filter(|node| !self.parents.contains_key(&node.id))
            .collect()
    }

    /// Ancestor ids ordered root -> ... -> parent.
    pub fn ancestor_path(&self, id: NodeId) -> Traversal<Vec<NodeId>> {
        let walk = self.walk_up(id);
        let mut path = walk.value;
        path.reverse();
        Traversal {
            value: path,
            truncated: walk.truncated,
        }
    }

    /// Edge count from `id` to its nearest parentless ancestor.
    pub fn depth(&self, id: NodeId) -> Traversal<usize> {
        let walk = self.walk_up(id);
        Traversal {
            value: walk.value.len(),
            truncated: walk.truncated,
        }
    }

    fn walk_up(&self, id: NodeId) -> Traversal<Vec<NodeId>> {
        let mut visited = HashSet::from([id]);
        let mut ancestors = Vec::new();
        let mut current = id;
        for _ in 0..MAX_TRAVERSAL_STEPS {
            let Some(parent) = self.parent_of(current) else {
                return Traversal {
                    value: ancestors,
                    truncated: false,
                };
            };
            if !visited.insert(parent) {
                warn!(
                    "event=graph_walk module=graph status=truncated reason=cycle node_id={id} steps={}",
                    ancestors.len()
                );
                return Traversal {
                    value: ancestors,
                    truncated: true,
                };
            }
            ancestors.push(parent);
            current = parent;
        }

        let truncated = self.parent_of(current).is_some();
        if truncated {
            warn!(
                "event=graph_walk module=graph status=truncated reason=step_cap node_id={id} steps={MAX_TRAVERSAL_STEPS}"
            );
        }
        Traversal {
            value: ancestors,
            truncated,
        }
    }

    /// Node count of the subtree rooted at `id`; collapsed nodes count as 1.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        let mut memo = HashMap::new();
        self.subtree_size_memo(id, &mut memo)
    }

    /// Memoized subtree size, shared across calls by layout.
    pub fn subtree_size_memo(&self, id: NodeId, memo: &mut HashMap<NodeId, usize>) -> usize {
        if let Some(size) = memo.get(&id) {
            return *size;
        }

        let mut stack = vec![(id, false)];
        let mut on_path: HashSet<NodeId> = HashSet::new();
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                on_path.remove(&current);
                let size = 1 + self
                    .child_ids(current)
                    .iter()
                    .filter_map(|child| memo.get(child))
                    .sum::<usize>();
                memo.insert(current, size);
                continue;
            }
            if memo.contains_key(&current) {
                continue;
            }
            let expands = self.node(current).is_some_and(|node| !node.collapsed);
            if !expands {
                memo.insert(current, 1);
                continue;
            }

            on_path.insert(current);
            stack.push((current, true));
            for child in self.child_ids(current) {
                if !memo.contains_key(child) && !on_path.contains(child) {
                    stack.push((*child, false));
                }
            }
        }

        memo.get(&id).copied().unwrap_or(1)
    }

    /// Every node reachable from `id` through child edges, `id` included,
    /// in breadth-first order. Collapse state is ignored. Flagged roots are
    /// never entered, so a stray edge cannot pull a root into the set.
    pub fn descendants_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::from([id]);
        let mut order = vec![id];
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.child_ids(current) {
                let is_root = self.node(*child).is_some_and(|node| node.is_root);
                if !is_root && seen.insert(*child) {
                    order.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        order
    }

    /// Ids hidden under a collapsed ancestor.
    fn hidden_ids(&self) -> HashSet<NodeId> {
        let mut hidden = HashSet::new();
        let mut queue: VecDeque<NodeId> = self
            .page
            .nodes
            .iter()
            .filter(|node| node.collapsed)
            .flat_map(|node| self.child_ids(node.id).iter().copied())
            .collect();
        while let Some(current) = queue.pop_front() {
            if hidden.insert(current) {
                queue.extend(self.child_ids(current).iter().copied());
            }
        }
        hidden
    }

    /// Nodes with no collapsed ancestor, in node order.
    pub fn visible_nodes(&self) -> Vec<&'a Node> {
        let hidden = self.hidden_ids();
        self.page
            .nodes
            .iter()
            .filter(|node| !hidden.contains(&node.id))
            .collect()
    }

    /// Edges whose endpoints are both visible, in edge order.
    pub fn visible_edges(&self) -> Vec<Edge> {
        let hidden = self.hidden_ids();
        self.page
            .edges
            .iter()
            .filter(|edge| {
                self.contains(edge.from)
                    && self.contains(edge.to)
                    && !hidden.contains(&edge.from)
                    && !hidden.contains(&edge.to)
            })
            .copied()
            .collect()
    }

    /// Bounding box of visible nodes, or `None` for an empty page.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut nodes = self.visible_nodes().into_iter();
        let first = nodes.next()?;
        let mut bounds = Bounds {
            min: Point::new(first.x, first.y),
            max: Point::new(first.x, first.y),
        };
        for node in nodes {
            bounds.min.x = bounds.min.x.min(node.x);
            bounds.min.y = bounds.min.y.min(node.y);
            bounds.max.x = bounds.max.x.max(node.x);
            bounds.max.y = bounds.max.y.max(node.y);
        }
        Some(bounds)
    }

    /// Closest visible node in `direction` from `id`.
    ///
    /// Candidates must lie within 90 degrees of the direction and at least one
    /// unit away; the score is angular deviation weighted against distance.
    pub fn nearest_in_direction(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let from = self.node(id)?;
        let target = direction.angle();

        let mut best: Option<(NodeId, f64)> = None;
        for node in self.visible_nodes() {
            if node.id == id {
                continue;
            }
            let dx = node.x - from.x;
            let dy = node.y - from.y;
            let distance = dx.hypot(dy);
            if distance < 1.0 {
                continue;
            }
            let deviation = normalize_angle(dy.atan2(dx) - target).abs();
            if deviation > PI / 2.0 {
                continue;
            }
            let score = deviation * DIRECTION_ANGLE_WEIGHT + distance;
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((node.id, score));
            }
        }
        best.map(|(node_id, _)| node_id)
    }
}

fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::{Direction, PageGraph, MAX_TRAVERSAL_STEPS};
    use crate::model::node::{Edge, Node};
    use crate::model::page::Page;

    fn page_with(edges: &[(u64, u64)], node_count: u64) -> Page {
        let mut page = Page::new(1, "Test");
        for id in 1..=node_count {
            page.nodes.push(Node::new(id, format!("n{id}"), 0.0, 0.0));
        }
        page.nodes[0].is_root = true;
        page.edges = edges.iter().map(|(from, to)| Edge::new(*from, *to)).collect();
        page
    }

    #[test]
    fn parent_children_and_ancestors() {
        let page = page_with(&[(1, 2), (1, 3), (2, 4)], 4);
        let graph = PageGraph::new(&page);

        let children: Vec<u64> = graph.children_of(1).iter().map(|node| node.id).collect();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(graph.parent_of(4), Some(2));
        assert_eq!(graph.parent_of(1), None);

        let path = graph.ancestor_path(4);
        assert_eq!(path.value, vec![1, 2]);
        assert!(!path.truncated);
        assert_eq!(graph.depth(4).value, 2);
        assert_eq!(graph.depth(1).value, 0);
    }

    #[test]
    fn subtree_size_counts_collapsed_node_as_one() {
        let mut page = page_with(&[(1, 2), (2, 3), (2, 4), (4, 5)], 5);
        assert_eq!(PageGraph::new(&page).subtree_size(1), 5);
        assert_eq!(PageGraph::new(&page).subtree_size(2), 4);

        page.node_mut(2).unwrap().collapsed = true;
        let graph = PageGraph::new(&page);
        assert_eq!(graph.subtree_size(2), 1);
        assert_eq!(graph.subtree_size(1), 2);
    }

    #[test]
    fn collapsed_node_hides_descendants_but_stays_visible() {
        let mut page = page_with(&[(1, 2), (2, 3), (2, 4), (2, 5), (3, 6)], 6);
        page.node_mut(2).unwrap().collapsed = true;
        let graph = PageGraph::new(&page);

        let visible: Vec<u64> = graph.visible_nodes().iter().map(|node| node.id).collect();
        assert_eq!(visible, vec![1, 2]);
        assert_eq!(graph.visible_edges(), vec![Edge::new(1, 2)]);
    }

    #[test]
    fn cyclic_edges_do_not_hang_queries() {
        let page = page_with(&[(2, 3), (3, 2)], 3);
        let graph = PageGraph::new(&page);

        let path = graph.ancestor_path(2);
        assert!(path.truncated);
        assert_eq!(graph.subtree_size(2), 2);
        assert_eq!(graph.descendants_inclusive(2), vec![2, 3]);
    }

    #[test]
    fn descendants_never_include_a_flagged_root() {
        let page = page_with(&[(1, 2), (2, 1), (2, 3)], 3);
        let graph = PageGraph::new(&page);

        assert_eq!(graph.descendants_inclusive(2), vec![2, 3]);
    }

    #[test]
    fn deep_chain_is_truncated_at_step_cap() {
        let count = (MAX_TRAVERSAL_STEPS + 10) as u64;
        let edges: Vec<(u64, u64)> = (1..count).map(|id| (id, id + 1)).collect();
        let page = page_with(&edges, count);
        let graph = PageGraph::new(&page);

        let depth = graph.depth(count);
        assert!(depth.truncated);
        assert_eq!(depth.value, MAX_TRAVERSAL_STEPS);
        assert!(!graph.depth(10).truncated);
    }

    #[test]
    fn nearest_in_direction_prefers_aligned_nodes() {
        let mut page = page_with(&[(1, 2), (1, 3), (1, 4)], 4);
        page.node_mut(2).unwrap().x = 100.0;
        page.node_mut(2).unwrap().y = 1.0;
        page.node_mut(3).unwrap().x = -100.0;
        page.node_mut(3).unwrap().y = 1.0;
        page.node_mut(4).unwrap().y = 50.0;
        page.node_mut(4).unwrap().x = 10.0;
        let graph = PageGraph::new(&page);

        assert_eq!(graph.nearest_in_direction(1, Direction::Right), Some(2));
        assert_eq!(graph.nearest_in_direction(1, Direction::Left), Some(3));
        assert_eq!(graph.nearest_in_direction(1, Direction::Down), Some(4));
        assert_eq!(graph.nearest_in_direction(1, Direction::Up), None);
    }

    #[test]
    fn bounds_cover_visible_nodes() {
        let mut page = page_with(&[(1, 2)], 2);
        page.node_mut(2).unwrap().x = 40.0;
        page.node_mut(2).unwrap().y = -20.0;
        let bounds = PageGraph::new(&page).bounds().unwrap();
        assert_eq!(bounds.width(), 40.0);
        assert_eq!(bounds.height(), 20.0);
        assert!(PageGraph::new(&Page::new(2, "Empty")).bounds().is_none());
    }
}
