//! Built-in page templates.

use crate::graph::view::Point;
use crate::graph::workspace::Workspace;
use crate::model::node::NodeId;

/// One node of a template tree, positioned relative to the page center.
#[derive(Debug)]
pub struct TemplateNode {
    pub label: &'static str,
    pub dx: f64,
    pub dy: f64,
    pub children: &'static [TemplateNode],
}

/// Named starter tree for a new page.
#[derive(Debug)]
pub struct PageTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub root: TemplateNode,
}

impl PageTemplate {
    /// Creates the template's nodes on the workspace's active page.
    ///
    /// Returns the root id, or `None` when there is no active page.
    pub fn build(&self, workspace: &mut Workspace, center: Point) -> Option<NodeId> {
        let root = workspace.create_node(
            self.root.label,
            center.x + self.root.dx,
            center.y + self.root.dy,
            None,
            true,
        )?;
        build_children(workspace, root, self.root.children, center);
        Some(root)
    }
}

fn build_children(
    workspace: &mut Workspace,
    parent: NodeId,
    children: &[TemplateNode],
    center: Point,
) {
    for child in children {
        if let Some(id) = workspace.create_node(
            child.label,
            center.x + child.dx,
            center.y + child.dy,
            Some(parent),
            false,
        ) {
            build_children(workspace, id, child.children, center);
        }
    }
}

macro_rules! leaf {
    ($label:expr, $dx:expr, $dy:expr $(,)?) => {
        TemplateNode {
            label: $label,
            dx: $dx,
            dy: $dy,
            children: &[],
        }
    };
}

macro_rules! root {
    ($label:expr, $children:expr $(,)?) => {
        TemplateNode {
            label: $label,
            dx: 0.0,
            dy: 0.0,
            children: $children,
        }
    };
}

pub const TEMPLATES: &[PageTemplate] = &[
    PageTemplate {
        name: "Meeting Notes",
        description: "Attendees, Action Items, Decisions",
        root: root!(
            "Meeting Notes",
            &[
                leaf!("Attendees", -120.0, -80.0),
                leaf!("Action Items", 120.0, -80.0),
                leaf!("Decisions", 0.0, 100.0),
                leaf!("Follow-ups", 120.0, 100.0),
            ],
        ),
    },
    PageTemplate {
        name: "Project Tracker",
        description: "Tasks, Timeline, Resources, Risks",
        root: root!(
            "Project Name",
            &[
                leaf!("Tasks", -140.0, -60.0),
                leaf!("Timeline", 140.0, -60.0),
                leaf!("Resources", -140.0, 80.0),
                leaf!("Risks", 140.0, 80.0),
            ],
        ),
    },
    PageTemplate {
        name: "Personnel Tracker",
        description: "Roster, Training, Awards, Leave",
        root: root!(
            "Personnel",
            &[
                leaf!("Roster", -130.0, -70.0),
                leaf!("Training", 130.0, -70.0),
                leaf!("Awards", -130.0, 90.0),
                leaf!("Leave", 130.0, 90.0),
            ],
        ),
    },
    PageTemplate {
        name: "Additional Duties",
        description: "Duty categories with assigned personnel",
        root: root!(
            "Additional Duties",
            &[
                TemplateNode {
                    label: "DTS",
                    dx: -160.0,
                    dy: -40.0,
                    children: &[
                        leaf!("PKA Rep", -240.0, -100.0),
                        leaf!("PKB Rep", -160.0, -120.0),
                    ],
                },
                TemplateNode {
                    label: "AO",
                    dx: 160.0,
                    dy: -40.0,
                    children: &[leaf!("PKC Rep", 80.0, -100.0)],
                },
                leaf!("Facility Manager", -60.0, 100.0),
                leaf!("Fitness Program", 160.0, 80.0),
            ],
        ),
    },
    PageTemplate {
        name: "Weekly Plan",
        description: "Mon-Fri with priorities",
        root: root!(
            "This Week",
            &[
                leaf!("Monday", -200.0, 100.0),
                leaf!("Tuesday", -100.0, 100.0),
                leaf!("Wednesday", 0.0, 100.0),
                leaf!("Thursday", 100.0, 100.0),
                leaf!("Friday", 200.0, 100.0),
            ],
        ),
    },
    PageTemplate {
        name: "Blank",
        description: "Just a root node",
        root: root!("Untitled", &[]),
    },
];

/// Looks up a template by case-insensitive name.
pub fn find_template(name: &str) -> Option<&'static PageTemplate> {
    let wanted = name.trim();
    TEMPLATES
        .iter()
        .find(|template| template.name.eq_ignore_ascii_case(wanted))
}
