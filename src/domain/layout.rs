//! Task graph layout
//!
//! Places every visible issue on a grid for the graph view. Lanes are
//! columns read left to right: leaves start on the left and each parent sits
//! one lane past the furthest of its children, so a lane counts the stages
//! that come before the issue. Rows are assigned in emission order, children
//! before their parent.
//!
//! Visibility rules:
//! - terminal issues are hidden unless some descendant is still active
//! - ideas at the root level are hidden; nested ideas stay visible
//!
//! An issue with several parents is drawn once, under whichever parent is
//! reached first.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::graph::{build_graph, IssueGraph};
use super::id::IssueId;
use super::issue::{ExecutionMode, Issue, IssueType};
use super::next::is_actionable;

/// One placed issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub issue: Issue,
    pub lane: usize,
    pub row: usize,
    pub is_actionable: bool,
}

/// Grid placement of the visible issue graph, ordered by row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskGraphLayout {
    pub nodes: Vec<LayoutNode>,
    pub total_lanes: usize,
}

impl TaskGraphLayout {
    /// Finds the placement of an issue
    pub fn node(&self, id: &IssueId) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| &n.issue.id == id)
    }
}

/// Lays out the issue graph for display
pub fn build_task_graph_layout(issues: &[Issue]) -> TaskGraphLayout {
    let full = build_graph(issues);
    let visible = visible_issues(issues, &full);
    let graph = build_graph(&visible);

    let mut placer = Placer {
        graph: &graph,
        full: &full,
        emitted: HashSet::new(),
        on_path: HashSet::new(),
        nodes: Vec::with_capacity(visible.len()),
    };

    for issue in &visible {
        if graph.root_issue_ids.contains(&issue.id) && !placer.emitted.contains(&issue.id) {
            placer.place(&issue.id, 0);
        }
    }

    // Issues only reachable through a cycle have no root above them
    for issue in &visible {
        if !placer.emitted.contains(&issue.id) {
            debug!(id = %issue.id, "placing issue outside any root");
            placer.place(&issue.id, 0);
        }
    }

    let nodes = placer.nodes;
    let total_lanes = nodes.iter().map(|n| n.lane + 1).max().unwrap_or(0);
    debug!(nodes = nodes.len(), lanes = total_lanes, "built task graph layout");

    TaskGraphLayout { nodes, total_lanes }
}

/// Applies the visibility rules, preserving input order
fn visible_issues(issues: &[Issue], full: &IssueGraph) -> Vec<Issue> {
    let mut seen = HashSet::new();
    let unfinished: Vec<Issue> = issues
        .iter()
        .filter(|issue| seen.insert(&issue.id))
        .filter(|issue| !issue.status.is_terminal() || full.has_active_descendant(&issue.id))
        .cloned()
        .collect();

    let trimmed = build_graph(&unfinished);
    unfinished
        .into_iter()
        .filter(|issue| {
            !(issue.issue_type == IssueType::Idea && trimmed.root_issue_ids.contains(&issue.id))
        })
        .collect()
}

struct Placer<'a> {
    graph: &'a IssueGraph,
    /// Unfiltered graph, used for actionability
    full: &'a IssueGraph,
    emitted: HashSet<IssueId>,
    on_path: HashSet<IssueId>,
    nodes: Vec<LayoutNode>,
}

/// An issue whose children are still being placed
struct Frame {
    id: IssueId,
    mode: ExecutionMode,
    start_lane: usize,
    children: Vec<IssueId>,
    cursor: usize,
    previous_lane: Option<usize>,
    max_child_lane: Option<usize>,
}

impl Frame {
    fn finish(&self) -> usize {
        self.max_child_lane.map_or(self.start_lane, |max| max + 1)
    }
}

impl Placer<'_> {
    /// Children of `id` not yet drawn and not above it on the current path
    fn pending_children(&self, id: &IssueId) -> Vec<IssueId> {
        self.graph
            .get(id)
            .map(|node| {
                node.child_issue_ids
                    .iter()
                    .filter(|c| !self.emitted.contains(*c) && !self.on_path.contains(*c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn open(&mut self, id: IssueId, start_lane: usize) -> Frame {
        let mode = self
            .graph
            .get(&id)
            .map_or(ExecutionMode::Series, |node| node.issue.execution_mode);
        self.on_path.insert(id.clone());
        let children = self.pending_children(&id);
        Frame {
            id,
            mode,
            start_lane,
            children,
            cursor: 0,
            previous_lane: None,
            max_child_lane: None,
        }
    }

    /// Next child of `frame` that an earlier subtree has not drawn already
    fn next_child(&self, frame: &mut Frame) -> Option<IssueId> {
        while let Some(child) = frame.children.get(frame.cursor) {
            frame.cursor += 1;
            if !self.emitted.contains(child) {
                return Some(child.clone());
            }
        }
        None
    }

    /// Lays out the subtree under `root` starting at `start_lane`
    ///
    /// Depth-first with an explicit stack, so long parent chains are fine.
    fn place(&mut self, root: &IssueId, start_lane: usize) {
        let mut stack = vec![self.open(root.clone(), start_lane)];

        while let Some(mut frame) = stack.pop() {
            if let Some(child) = self.next_child(&mut frame) {
                let start = match frame.mode {
                    ExecutionMode::Parallel => frame.start_lane,
                    ExecutionMode::Series => {
                        let is_subtree = !self.pending_children(&child).is_empty();
                        series_start(frame.start_lane, frame.previous_lane, is_subtree)
                    }
                };
                let child_frame = self.open(child, start);
                stack.push(frame);
                stack.push(child_frame);
                continue;
            }

            let lane = frame.finish();
            self.emit(&frame.id, lane);
            if let Some(parent) = stack.last_mut() {
                parent.previous_lane = Some(lane);
                parent.max_child_lane = parent.max_child_lane.max(Some(lane));
            }
        }
    }

    fn emit(&mut self, id: &IssueId, lane: usize) {
        self.on_path.remove(id);
        self.emitted.insert(id.clone());

        let Some(node) = self.graph.get(id) else {
            return;
        };
        let is_actionable = self.full.get(id).is_some_and(is_actionable);
        self.nodes.push(LayoutNode {
            issue: node.issue.clone(),
            lane,
            row: self.nodes.len(),
            is_actionable,
        });
    }
}

/// Start lane for the next child of a series parent
///
/// The first child starts where the parent starts. A leaf stacks in the lane
/// of the sibling before it; a subtree must begin after that sibling.
fn series_start(parent_start: usize, previous: Option<usize>, is_subtree: bool) -> usize {
    match previous {
        None => parent_start,
        Some(lane) if is_subtree => lane + 1,
        Some(lane) => lane,
    }
}
