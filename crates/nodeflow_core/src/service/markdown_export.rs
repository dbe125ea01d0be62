//! Markdown projection of a page.
//!
//! # Invariants
//! - The flagged root contributes only its notes, as a leading paragraph.
//! - Every node appears once; nodes unreachable from the flagged root follow
//!   as top-level bullets.
//! - Traversal is cycle-safe.

use crate::graph::view::PageGraph;
use crate::model::node::{Node, NodeId, NodeStatus};
use crate::model::page::Page;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").expect("valid line regex"));

/// Renders `page` as a nested markdown outline.
pub fn page_to_markdown(page: &Page) -> String {
    let graph = PageGraph::new(page);
    let mut out = format!("# {}\n\n", page.name);
    let mut emitted = HashSet::new();

    if let Some(root) = page.flagged_root() {
        emitted.insert(root.id);
        if !root.notes.is_empty() {
            out.push_str(&root.notes);
            out.push_str("\n\n");
        }
        for &child in graph.child_ids(root.id) {
            write_subtree(&graph, child, 0, &mut emitted, &mut out);
        }
    }

    for node in &page.nodes {
        if emitted.insert(node.id) {
            out.push('\n');
            write_bullet(node, "", &mut out);
        }
    }
    out
}

fn write_subtree(
    graph: &PageGraph<'_>,
    id: NodeId,
    depth: usize,
    emitted: &mut HashSet<NodeId>,
    out: &mut String,
) {
    let Some(node) = graph.node(id) else {
        return;
    };
    if !emitted.insert(id) {
        return;
    }
    write_bullet(node, &"  ".repeat(depth), out);
    for &child in graph.child_ids(id) {
        write_subtree(graph, child, depth + 1, emitted, out);
    }
}

fn write_bullet(node: &Node, indent: &str, out: &mut String) {
    out.push_str(indent);
    out.push_str("- **");
    out.push_str(&node.label);
    out.push_str("**");
    if node.status != NodeStatus::None {
        out.push_str(" [");
        out.push_str(&node.status.as_str().to_uppercase());
        out.push(']');
    }
    out.push('\n');
    if node.notes.is_empty() {
        return;
    }
    for line in LINE_BREAK_RE.split(&node.notes) {
        out.push_str(indent);
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::page_to_markdown;
    use crate::graph::workspace::Workspace;
    use crate::model::node::{Node, NodeStatus};

    #[test]
    fn renders_nested_outline_with_status_and_notes() {
        let mut workspace = Workspace::with_default_page();
        let root = workspace.active_page().unwrap().nodes[0].id;
        workspace.set_notes(root, "Overview");
        let a = workspace.create_node("Alpha", 0.0, 0.0, Some(root), false).unwrap();
        workspace.set_status(a, NodeStatus::Doing);
        let a1 = workspace.create_node("Alpha one", 0.0, 0.0, Some(a), false).unwrap();
        workspace.set_notes(a1, "line one\r\nline two");
        workspace.create_node("Beta", 0.0, 0.0, Some(root), false);

        let markdown = page_to_markdown(workspace.active_page().unwrap());
        assert_eq!(
            markdown,
            "# My Notes\n\nOverview\n\n- **Alpha** [DOING]\n  - **Alpha one**\n    line one\n    line two\n- **Beta**\n"
        );
    }

    #[test]
    fn unreachable_nodes_are_appended_once() {
        let workspace = Workspace::with_default_page();
        let mut page = workspace.active_page().unwrap().clone();
        let mut orphan = Node::new(99, "Loose", 0.0, 0.0);
        orphan.status = NodeStatus::Todo;
        page.nodes.push(orphan);

        let markdown = page_to_markdown(&page);
        assert_eq!(markdown, "# My Notes\n\n\n- **Loose** [TODO]\n");
    }
}
