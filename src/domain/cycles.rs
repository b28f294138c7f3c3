//! Cycle detection over parent links
//!
//! Edges run child -> parent. A proposed link is rejected when the child is
//! already an ancestor of the proposed parent. Status is ignored here:
//! completed and deleted issues still take part in the ancestry walk.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{has_path_connecting, is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use super::id::IssueId;
use super::issue::Issue;

/// Result of [`validate_cycles`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub is_valid: bool,
    /// Each cycle starts and ends with the same ID
    pub cycles: Vec<Vec<IssueId>>,
}

/// Child -> parent adjacency across every issue in the snapshot
struct ParentLinks {
    graph: DiGraph<IssueId, ()>,
    node_map: HashMap<IssueId, NodeIndex>,
}

impl ParentLinks {
    fn from_issues(issues: &[Issue]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for issue in issues {
            if !node_map.contains_key(&issue.id) {
                let idx = graph.add_node(issue.id.clone());
                node_map.insert(issue.id.clone(), idx);
            }
        }

        let mut seen = HashSet::new();
        for issue in issues {
            // Later duplicates of an ID do not contribute edges
            if !seen.insert(&issue.id) {
                continue;
            }
            let child_idx = node_map[&issue.id];
            for parent_ref in &issue.parent_issues {
                if let Some(&parent_idx) = node_map.get(&parent_ref.parent_issue_id) {
                    graph.update_edge(child_idx, parent_idx, ());
                }
            }
        }

        Self { graph, node_map }
    }

    /// Parents of `idx` in the order they were linked
    fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        // petgraph walks edges newest first
        let mut parents: Vec<_> = self.graph.neighbors(idx).collect();
        parents.reverse();
        parents
    }
}

/// Reports each elementary cycle in the parent links of `issues` once
///
/// Cycles are enumerated inside each strongly connected component with
/// Johnson's algorithm. Every cycle starts at its member that comes first in
/// the input, and cycles are listed by that starting issue. The path that led
/// into a cycle is never part of it.
pub fn validate_cycles(issues: &[Issue]) -> CycleReport {
    let links = ParentLinks::from_issues(issues);
    if !is_cyclic_directed(&links.graph) {
        return CycleReport {
            is_valid: true,
            cycles: Vec::new(),
        };
    }

    // Component of every node that can sit on a cycle
    let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
    for (component, members) in tarjan_scc(&links.graph).into_iter().enumerate() {
        let cyclic = members.len() > 1
            || members
                .first()
                .is_some_and(|&n| links.graph.contains_edge(n, n));
        if cyclic {
            component_of.extend(members.into_iter().map(|n| (n, component)));
        }
    }

    let mut cycles = Vec::new();
    for start in links.graph.node_indices() {
        let Some(&component) = component_of.get(&start) else {
            continue;
        };
        // Cycles through earlier nodes were reported from those nodes
        let allowed: HashSet<NodeIndex> = component_of
            .iter()
            .filter(|(n, c)| **c == component && n.index() >= start.index())
            .map(|(n, _)| *n)
            .collect();
        let reachable = links.strongly_connected_with(start, &allowed);

        for circuit in links.circuits_from(start, &reachable) {
            let mut cycle: Vec<IssueId> =
                circuit.iter().map(|n| links.graph[*n].clone()).collect();
            cycle.push(links.graph[start].clone());
            debug!(cycle = ?cycle, "found dependency cycle");
            cycles.push(cycle);
        }
    }

    CycleReport {
        is_valid: cycles.is_empty(),
        cycles,
    }
}

impl ParentLinks {
    /// Nodes of `allowed` that are on some cycle through `start` within it
    fn strongly_connected_with(
        &self,
        start: NodeIndex,
        allowed: &HashSet<NodeIndex>,
    ) -> HashSet<NodeIndex> {
        let walk = |direction: Direction| {
            let mut seen = HashSet::from([start]);
            let mut pending = vec![start];
            while let Some(node) = pending.pop() {
                for next in self.graph.neighbors_directed(node, direction) {
                    if allowed.contains(&next) && seen.insert(next) {
                        pending.push(next);
                    }
                }
            }
            seen
        };
        let forward = walk(Direction::Outgoing);
        let backward = walk(Direction::Incoming);
        forward.intersection(&backward).copied().collect()
    }

    /// Elementary circuits through `start` inside `within`, as node paths
    /// beginning at `start`
    fn circuits_from(
        &self,
        start: NodeIndex,
        within: &HashSet<NodeIndex>,
    ) -> Vec<Vec<NodeIndex>> {
        // Reversed so popping yields parents in linked order
        let successors = |node: NodeIndex| -> Vec<NodeIndex> {
            let mut next: Vec<_> = self
                .parents(node)
                .into_iter()
                .filter(|n| within.contains(n))
                .collect();
            next.reverse();
            next
        };

        let mut circuits = Vec::new();
        let mut path = vec![start];
        let mut blocked = HashSet::from([start]);
        let mut closed: HashSet<NodeIndex> = HashSet::new();
        let mut blocked_by: HashMap<NodeIndex, HashSet<NodeIndex>> = HashMap::new();
        let mut stack = vec![(start, successors(start))];

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            let candidate = pending.pop();
            let exhausted = pending.is_empty();

            match candidate {
                Some(next) if next == start => {
                    circuits.push(path.clone());
                    closed.extend(path.iter().copied());
                }
                Some(next) if !blocked.contains(&next) => {
                    path.push(next);
                    closed.remove(&next);
                    blocked.insert(next);
                    stack.push((next, successors(next)));
                    continue;
                }
                _ => {}
            }

            if exhausted {
                if closed.contains(&node) {
                    unblock(node, &mut blocked, &mut blocked_by);
                } else {
                    for next in successors(node) {
                        blocked_by.entry(next).or_default().insert(node);
                    }
                }
                stack.pop();
                path.pop();
            }
        }

        circuits
    }
}

fn unblock(
    node: NodeIndex,
    blocked: &mut HashSet<NodeIndex>,
    blocked_by: &mut HashMap<NodeIndex, HashSet<NodeIndex>>,
) {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        if blocked.remove(&node) {
            if let Some(waiting) = blocked_by.remove(&node) {
                pending.extend(waiting);
            }
        }
    }
}

/// Returns true if making `parent` a parent of `child` would close a cycle
///
/// That is the case when `child` is `parent` itself or already one of
/// `parent`'s ancestors.
pub fn would_create_cycle(issues: &[Issue], parent: &IssueId, child: &IssueId) -> bool {
    if parent == child {
        return true;
    }

    let links = ParentLinks::from_issues(issues);
    match (links.node_map.get(parent), links.node_map.get(child)) {
        (Some(&from), Some(&to)) => has_path_connecting(&links.graph, from, to, None),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::issue::{IssueStatus, ParentIssueRef};

    fn key(s: &str) -> IssueId {
        s.parse().unwrap()
    }

    /// Builds an issue listing the given parents
    fn issue(id: &str, parents: &[&str]) -> Issue {
        let mut issue = Issue::new(key(id), id);
        for p in parents {
            issue.parent_issues.push(ParentIssueRef::new(key(p), "a"));
        }
        issue
    }

    fn names(cycle: &[IssueId]) -> Vec<&str> {
        cycle.iter().map(IssueId::as_str).collect()
    }

    /// A has parents B and C, both of which have parent D
    fn diamond() -> Vec<Issue> {
        vec![
            issue("A", &["B", "C"]),
            issue("B", &["D"]),
            issue("C", &["D"]),
            issue("D", &[]),
        ]
    }

    #[test]
    fn empty_is_valid() {
        let report = validate_cycles(&[]);
        assert!(report.is_valid);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn self_reference_is_cycle() {
        let report = validate_cycles(&[issue("a", &["a"])]);
        assert!(!report.is_valid);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(names(&report.cycles[0]), vec!["a", "a"]);
    }

    #[test]
    fn mutual_pair_reported_once() {
        let report = validate_cycles(&[issue("A", &["B"]), issue("B", &["A"])]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(names(&report.cycles[0]), vec!["A", "B", "A"]);
    }

    #[test]
    fn diamond_has_no_cycles() {
        let report = validate_cycles(&diamond());
        assert!(report.is_valid);
    }

    #[test]
    fn disjoint_cycles_reported_separately() {
        let report = validate_cycles(&[
            issue("a", &["b"]),
            issue("b", &["a"]),
            issue("x", &["y"]),
            issue("y", &["z"]),
            issue("z", &["x"]),
        ]);
        assert_eq!(report.cycles.len(), 2);
        assert_eq!(names(&report.cycles[0]), vec!["a", "b", "a"]);
        assert_eq!(names(&report.cycles[1]), vec!["x", "y", "z", "x"]);
    }

    #[test]
    fn tail_is_excluded_from_cycle() {
        let report = validate_cycles(&[
            issue("tail", &["a"]),
            issue("a", &["b"]),
            issue("b", &["a"]),
        ]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(names(&report.cycles[0]), vec!["a", "b", "a"]);
    }

    #[test]
    fn overlapping_cycles_are_each_reported() {
        let report = validate_cycles(&[
            issue("A", &["B", "C"]),
            issue("B", &["C"]),
            issue("C", &["A"]),
        ]);
        let found: Vec<_> = report.cycles.iter().map(|c| names(c)).collect();
        assert_eq!(found, vec![vec!["A", "B", "C", "A"], vec!["A", "C", "A"]]);
    }

    #[test]
    fn cycles_sharing_one_hub() {
        let report = validate_cycles(&[
            issue("hub", &["x", "y"]),
            issue("x", &["hub"]),
            issue("y", &["hub"]),
        ]);
        let found: Vec<_> = report.cycles.iter().map(|c| names(c)).collect();
        assert_eq!(found, vec![vec!["hub", "x", "hub"], vec!["hub", "y", "hub"]]);
    }

    #[test]
    fn complete_triangle_has_five_cycles() {
        // Every pair points both ways: three two-cycles and two three-cycles
        let report = validate_cycles(&[
            issue("a", &["b", "c"]),
            issue("b", &["a", "c"]),
            issue("c", &["a", "b"]),
        ]);
        let found: Vec<_> = report.cycles.iter().map(|c| names(c)).collect();
        assert_eq!(
            found,
            vec![
                vec!["a", "b", "a"],
                vec!["a", "b", "c", "a"],
                vec!["a", "c", "a"],
                vec!["a", "c", "b", "a"],
                vec!["b", "c", "b"],
            ]
        );
    }

    #[test]
    fn self_loop_inside_larger_cycle() {
        let report = validate_cycles(&[issue("a", &["b"]), issue("b", &["b", "a"])]);
        let found: Vec<_> = report.cycles.iter().map(|c| names(c)).collect();
        assert_eq!(found, vec![vec!["a", "b", "a"], vec!["b", "b"]]);
    }

    #[test]
    fn long_cycle_is_reported_whole() {
        let n = 2_000;
        let mut issues: Vec<Issue> = (1..n)
            .map(|i| issue(&format!("n{}", i), &[&format!("n{}", i - 1)]))
            .collect();
        issues.insert(0, issue("n0", &[&format!("n{}", n - 1)]));

        let report = validate_cycles(&issues);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].len(), n + 1);
    }

    #[test]
    fn dangling_parents_are_ignored() {
        let report = validate_cycles(&[issue("a", &["missing"])]);
        assert!(report.is_valid);
    }

    #[test]
    fn ids_compare_case_insensitively() {
        let report = validate_cycles(&[issue("Alpha", &["beta"]), issue("BETA", &["alpha"])]);
        assert_eq!(report.cycles.len(), 1);
    }

    #[test]
    fn terminal_issues_still_count() {
        let mut a = issue("a", &["b"]);
        a.status = IssueStatus::Deleted;
        let report = validate_cycles(&[a, issue("b", &["a"])]);
        assert!(!report.is_valid);
    }

    #[test]
    fn self_link_would_create_cycle() {
        assert!(would_create_cycle(&[], &key("a"), &key("A")));
    }

    #[test]
    fn diamond_cycle_checks() {
        let issues = diamond();
        // D is the top: making D a child of A would loop
        assert!(would_create_cycle(&issues, &key("A"), &key("D")));
        assert!(!would_create_cycle(&issues, &key("D"), &key("A")));
    }

    #[test]
    fn unrelated_issues_never_cycle() {
        let issues = vec![issue("a", &[]), issue("b", &[])];
        assert!(!would_create_cycle(&issues, &key("a"), &key("b")));
        assert!(!would_create_cycle(&issues, &key("a"), &key("unknown")));
    }

    #[test]
    fn deep_chain_detected() {
        let mut issues = vec![issue("n0", &[])];
        for i in 1..200 {
            issues.push(issue(&format!("n{}", i), &[&format!("n{}", i - 1)]));
        }
        assert!(would_create_cycle(&issues, &key("n199"), &key("n0")));
        assert!(!would_create_cycle(&issues, &key("n0"), &key("n199")));
    }
}
