//! Issue graph
//!
//! Builds the parent/child DAG from a flat issue list and derives the
//! structural facts the scheduler needs: roots, sorted children, series
//! siblings (next/previous) and completion summaries.
//!
//! Construction never fails. Duplicate IDs keep their first occurrence,
//! self-parent links and parents missing from the input are ignored, so an
//! issue whose parents are all unresolvable becomes a root.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use tracing::debug;

use super::id::IssueId;
use super::issue::{ExecutionMode, Issue, IssueStatus, IssueType};

/// Computed view of a single issue inside an [`IssueGraph`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub issue: Issue,

    /// Resolvable parents, in the order the issue lists them
    pub parent_issue_ids: Vec<IssueId>,

    /// Children sorted by sort order, ties broken by input order
    pub child_issue_ids: Vec<IssueId>,

    /// Explicit predecessors present in the graph plus series-derived ones
    pub previous_issue_ids: Vec<IssueId>,

    /// Series-derived successors
    pub next_issue_ids: Vec<IssueId>,

    /// Mode of the first resolvable parent; `None` for roots
    pub parent_execution_mode: Option<ExecutionMode>,

    pub has_incomplete_children: bool,

    pub all_previous_done: bool,
}

impl GraphNode {
    pub fn id(&self) -> &IssueId {
        &self.issue.id
    }

    pub fn is_root(&self) -> bool {
        self.parent_issue_ids.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_issue_ids.is_empty()
    }
}

/// The parent/child DAG over one issue snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueGraph {
    pub nodes: BTreeMap<IssueId, GraphNode>,
    pub root_issue_ids: BTreeSet<IssueId>,
}

impl IssueGraph {
    /// Looks up a node by ID, ignoring case
    pub fn get(&self, id: &IssueId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &IssueId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns every transitive child of `id`, excluding `id` itself
    pub fn descendants(&self, id: &IssueId) -> BTreeSet<IssueId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&IssueId> = VecDeque::new();
        if let Some(node) = self.nodes.get(id) {
            queue.extend(&node.child_issue_ids);
        }

        while let Some(current) = queue.pop_front() {
            if current == id || !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                queue.extend(&node.child_issue_ids);
            }
        }

        seen
    }

    /// Returns true if some transitive child of `id` is not terminal
    pub fn has_active_descendant(&self, id: &IssueId) -> bool {
        self.descendants(id).iter().any(|d| {
            self.nodes
                .get(d)
                .is_some_and(|n| !n.issue.status.is_terminal())
        })
    }
}

/// A child edge waiting to be sorted under its parent
struct ChildEntry<'a> {
    sort_order: &'a str,
    input_index: usize,
    child: &'a IssueId,
}

/// Builds the issue graph from a flat list of issues
pub fn build_graph(issues: &[Issue]) -> IssueGraph {
    // First occurrence of each ID wins
    let mut index: HashMap<&IssueId, usize> = HashMap::new();
    let mut unique: Vec<&Issue> = Vec::new();
    for issue in issues {
        if index.contains_key(&issue.id) {
            debug!(id = %issue.id, "ignoring duplicate issue id");
            continue;
        }
        index.insert(&issue.id, unique.len());
        unique.push(issue);
    }

    let mut parents_of: Vec<Vec<IssueId>> = vec![Vec::new(); unique.len()];
    let mut children_of: Vec<Vec<ChildEntry>> = (0..unique.len()).map(|_| Vec::new()).collect();

    for (child_idx, issue) in unique.iter().enumerate() {
        for parent_ref in &issue.parent_issues {
            let parent_id = &parent_ref.parent_issue_id;
            if parent_id == &issue.id {
                debug!(id = %issue.id, "ignoring self-parent reference");
                continue;
            }
            let Some(&parent_idx) = index.get(parent_id) else {
                debug!(id = %issue.id, parent = %parent_id, "parent not in issue set");
                continue;
            };
            if parents_of[child_idx].contains(parent_id) {
                continue;
            }
            parents_of[child_idx].push(unique[parent_idx].id.clone());
            children_of[parent_idx].push(ChildEntry {
                sort_order: &parent_ref.sort_order,
                input_index: child_idx,
                child: &issue.id,
            });
        }
    }

    let mut previous_of: Vec<Vec<IssueId>> = vec![Vec::new(); unique.len()];
    let mut next_of: Vec<Vec<IssueId>> = vec![Vec::new(); unique.len()];
    let mut sorted_children: Vec<Vec<IssueId>> = Vec::with_capacity(unique.len());

    for (parent_idx, entries) in children_of.iter_mut().enumerate() {
        entries.sort_by(|a, b| {
            a.sort_order
                .cmp(b.sort_order)
                .then(a.input_index.cmp(&b.input_index))
        });
        let ordered: Vec<usize> = entries.iter().map(|e| e.input_index).collect();

        if unique[parent_idx].execution_mode == ExecutionMode::Series {
            link_series_siblings(&ordered, &unique, &mut previous_of, &mut next_of);
        }

        sorted_children.push(entries.iter().map(|e| e.child.clone()).collect());
    }

    let status_of = |id: &IssueId| index.get(id).map(|&i| unique[i].status);

    let mut graph = IssueGraph::default();
    for (idx, issue) in unique.iter().enumerate() {
        let mut previous = std::mem::take(&mut previous_of[idx]);
        for explicit in &issue.previous_issues {
            if explicit != &issue.id && index.contains_key(explicit) && !previous.contains(explicit)
            {
                previous.push(explicit.clone());
            }
        }

        let all_previous_done = previous
            .iter()
            .chain(&issue.previous_issues)
            .filter(|p| *p != &issue.id)
            .all(|p| status_of(p).map_or(true, |s| s.is_terminal()));

        let has_incomplete_children = sorted_children[idx]
            .iter()
            .any(|c| status_of(c).is_some_and(|s| !s.is_terminal()));

        let parent_execution_mode = parents_of[idx]
            .first()
            .and_then(|p| index.get(p))
            .map(|&i| unique[i].execution_mode);

        if parents_of[idx].is_empty() {
            graph.root_issue_ids.insert(issue.id.clone());
        }

        graph.nodes.insert(
            issue.id.clone(),
            GraphNode {
                issue: (*issue).clone(),
                parent_issue_ids: std::mem::take(&mut parents_of[idx]),
                child_issue_ids: std::mem::take(&mut sorted_children[idx]),
                previous_issue_ids: previous,
                next_issue_ids: std::mem::take(&mut next_of[idx]),
                parent_execution_mode,
                has_incomplete_children,
                all_previous_done,
            },
        );
    }

    debug!(
        issues = graph.nodes.len(),
        roots = graph.root_issue_ids.len(),
        "built issue graph"
    );
    graph
}

/// Chains consecutive series siblings through previous/next links
fn link_series_siblings(
    ordered: &[usize],
    issues: &[&Issue],
    previous_of: &mut [Vec<IssueId>],
    next_of: &mut [Vec<IssueId>],
) {
    for pair in ordered.windows(2) {
        let (before, after) = (pair[0], pair[1]);
        let before_id = &issues[before].id;
        let after_id = &issues[after].id;

        if !previous_of[after].contains(before_id) {
            previous_of[after].push(before_id.clone());
        }
        if !next_of[before].contains(after_id) {
            next_of[before].push(after_id.clone());
        }
    }
}

/// Criteria for [`query_graph`]; unset fields do not filter
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    pub statuses: Vec<IssueStatus>,
    pub types: Vec<IssueType>,
    pub tags: Vec<String>,
    pub assigned_to: Option<String>,
    pub priority: Option<i32>,
    pub linked_pr: Option<u64>,
    pub search_text: Option<String>,
    /// Restrict to this issue and its descendants
    pub root_issue_id: Option<IssueId>,
    /// Keep issues in terminal statuses
    pub include_terminal: bool,
    /// Keep terminal issues that still have non-terminal descendants
    pub include_inactive_with_active_descendants: bool,
}

impl GraphFilter {
    fn matches(&self, issue: &Issue) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&issue.status) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&issue.issue_type) {
            return false;
        }
        if !self.tags.is_empty()
            && !issue
                .tags
                .iter()
                .any(|t| self.tags.iter().any(|f| f.eq_ignore_ascii_case(t)))
        {
            return false;
        }
        if let Some(assignee) = &self.assigned_to {
            if !issue
                .assigned_to
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(assignee))
            {
                return false;
            }
        }
        if self.priority.is_some() && issue.priority != self.priority {
            return false;
        }
        if self.linked_pr.is_some() && issue.linked_pr != self.linked_pr {
            return false;
        }
        if let Some(text) = &self.search_text {
            let needle = text.to_lowercase();
            let hit = issue.id.as_str().to_lowercase().contains(&needle)
                || issue.title.to_lowercase().contains(&needle)
                || issue
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Builds the graph over the subset of `issues` selected by `filter`
///
/// Parents that are filtered away become dangling references, so their
/// surviving children show up as roots.
pub fn query_graph(issues: &[Issue], filter: &GraphFilter) -> IssueGraph {
    let full = build_graph(issues);

    let scope: Option<BTreeSet<IssueId>> = match &filter.root_issue_id {
        Some(root) if full.contains(root) => {
            let mut scope = full.descendants(root);
            scope.insert(root.clone());
            Some(scope)
        }
        Some(root) => {
            debug!(root = %root, "query root not found");
            return IssueGraph::default();
        }
        None => None,
    };

    let mut selected: Vec<Issue> = full
        .nodes
        .values()
        .map(|node| &node.issue)
        .filter(|issue| scope.as_ref().map_or(true, |s| s.contains(&issue.id)))
        .filter(|issue| {
            !issue.status.is_terminal()
                || filter.include_terminal
                || (filter.include_inactive_with_active_descendants
                    && full.has_active_descendant(&issue.id))
        })
        .filter(|issue| filter.matches(issue))
        .cloned()
        .collect();

    // Preserve input order so sibling tie-breaks match the unfiltered graph
    let order: HashMap<&IssueId, usize> = issues
        .iter()
        .enumerate()
        .rev()
        .map(|(i, issue)| (&issue.id, i))
        .collect();
    selected.sort_by_key(|issue| order.get(&issue.id).copied().unwrap_or(usize::MAX));

    build_graph(&selected)
}
