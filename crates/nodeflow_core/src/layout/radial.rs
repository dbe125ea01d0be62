//! Radial tree layout.
//!
//! # Responsibility
//! - Map a page to coordinates for every node that layout owns.
//! - Allocate each parent's angular sector to its children by subtree weight.
//!
//! # Invariants
//! - Pure and deterministic: identical input yields bit-identical output.
//! - Nodes with `manual_position` are never moved, but anchor their subtree.
//! - Recursion stops at collapsed nodes; hidden descendants keep stale
//!   coordinates.

use crate::graph::view::{PageGraph, Point};
use crate::model::node::NodeId;
use crate::model::page::Page;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::PI;

/// Smallest usable sector when sibling pads eat the whole range.
const MIN_USABLE_ANGLE: f64 = 0.1;

/// Layout constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Parent-child distance at depth zero.
    pub base_radius: f64,
    /// Geometric shrink factor applied per depth level.
    pub depth_falloff: f64,
    /// Floor for the parent-child distance.
    pub min_radius: f64,
    /// Angular gap (radians) reserved between neighbouring siblings.
    pub sibling_pad: f64,
    /// Horizontal slot per subtree node when several roots share a page.
    pub root_spacing: f64,
    /// Horizontal gap between neighbouring root slots.
    pub root_gap: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            base_radius: 160.0,
            depth_falloff: 0.85,
            min_radius: 80.0,
            sibling_pad: 0.15,
            root_spacing: 80.0,
            root_gap: 100.0,
        }
    }
}

impl LayoutParams {
    /// Distance from a parent to its children at `depth`.
    pub fn radius_at(&self, depth: u32) -> f64 {
        let depth = i32::try_from(depth).unwrap_or(i32::MAX);
        self.min_radius
            .max(self.base_radius * self.depth_falloff.powi(depth))
    }
}

/// Coordinates computed for layout-owned nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadialLayout {
    pub positions: BTreeMap<NodeId, Point>,
}

impl RadialLayout {
    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Writes computed coordinates back into the page.
    pub fn apply(&self, page: &mut Page) {
        for node in &mut page.nodes {
            if let Some(point) = self.positions.get(&node.id) {
                node.x = point.x;
                node.y = point.y;
            }
        }
    }
}

/// Computes coordinates for every non-manual node reachable from a root.
///
/// A single root sits at `center` (or stays at its manual position). Several
/// roots are laid out left to right on `center.y`, each in a slot
/// proportional to its subtree size.
pub fn compute_radial_layout(page: &Page, params: &LayoutParams, center: Point) -> RadialLayout {
    let graph = PageGraph::new(page);
    let mut pass = LayoutPass {
        graph: &graph,
        params,
        sizes: HashMap::new(),
        placed: HashSet::new(),
        layout: RadialLayout::default(),
    };

    let roots = graph.roots();
    if let [root] = roots.as_slice() {
        pass.layout_tree(root.id, center);
        return pass.layout;
    }

    let mut x_offset = 0.0;
    for root in roots {
        let spread = pass.size_of(root.id) as f64 * params.root_spacing;
        pass.layout_tree(
            root.id,
            Point::new(center.x + x_offset + spread / 2.0, center.y),
        );
        x_offset += spread + params.root_gap;
    }
    pass.layout
}

/// Runs the layout and writes it into `page`. Returns the number of moved
/// nodes.
pub fn layout_page(page: &mut Page, params: &LayoutParams, center: Point) -> usize {
    let layout = compute_radial_layout(page, params, center);
    layout.apply(page);
    layout.len()
}

struct LayoutPass<'g, 'p> {
    graph: &'g PageGraph<'p>,
    params: &'g LayoutParams,
    sizes: HashMap<NodeId, usize>,
    placed: HashSet<NodeId>,
    layout: RadialLayout,
}

impl LayoutPass<'_, '_> {
    fn size_of(&mut self, id: NodeId) -> usize {
        self.graph.subtree_size_memo(id, &mut self.sizes)
    }

    fn layout_tree(&mut self, root_id: NodeId, slot: Point) {
        let Some(root) = self.graph.node(root_id) else {
            return;
        };
        self.placed.insert(root_id);
        let anchor = if root.manual_position {
            Point::new(root.x, root.y)
        } else {
            self.layout.positions.insert(root_id, slot);
            slot
        };
        self.layout_children(root_id, anchor, 0.0, 2.0 * PI, 0);
    }

    fn layout_children(
        &mut self,
        parent_id: NodeId,
        anchor: Point,
        start_angle: f64,
        end_angle: f64,
        depth: u32,
    ) {
        match self.graph.node(parent_id) {
            Some(parent) if !parent.collapsed => {}
            _ => return,
        }
        let children: Vec<NodeId> = self
            .graph
            .child_ids(parent_id)
            .iter()
            .copied()
            .filter(|child| !self.placed.contains(child))
            .collect();
        if children.is_empty() {
            return;
        }
        self.placed.extend(children.iter().copied());

        let radius = self.params.radius_at(depth);
        let weights: Vec<usize> = children.iter().map(|child| self.size_of(*child)).collect();
        let total_weight: usize = weights.iter().sum();
        let total_pad = children.len().saturating_sub(1) as f64 * self.params.sibling_pad;
        let usable = (end_angle - start_angle - total_pad).max(MIN_USABLE_ANGLE);

        let mut angle = start_angle;
        for (child_id, weight) in children.into_iter().zip(weights) {
            let slice = weight as f64 / total_weight as f64 * usable;
            let mid = angle + slice / 2.0;

            let Some(child) = self.graph.node(child_id) else {
                continue;
            };
            let position = if child.manual_position {
                Point::new(child.x, child.y)
            } else {
                let point = Point::new(
                    anchor.x + mid.cos() * radius,
                    anchor.y + mid.sin() * radius,
                );
                self.layout.positions.insert(child_id, point);
                point
            };

            self.layout_children(child_id, position, mid - slice / 2.0, mid + slice / 2.0, depth + 1);
            angle += slice + self.params.sibling_pad;
        }
    }
}
