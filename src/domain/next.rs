//! Actionable issue resolution
//!
//! An issue is actionable when it is open or in review, is not an idea, has
//! no unfinished children, and every predecessor (explicit or series-derived)
//! is done. Predecessors missing from the snapshot count as done.

use std::cmp::Ordering;

use super::graph::{build_graph, GraphNode};
use super::id::IssueId;
use super::issue::{Issue, IssueStatus, IssueType};

/// Returns true if the issue behind `node` can be worked on now
pub fn is_actionable(node: &GraphNode) -> bool {
    let issue = &node.issue;
    if !issue.status.is_workable() || issue.issue_type == IssueType::Idea {
        return false;
    }
    // Unfinished children take precedence over the issue itself
    if node.has_incomplete_children {
        return false;
    }
    node.all_previous_done
}

/// Returns the actionable issues, best candidates first
///
/// With `parent_filter`, only that issue and its transitive descendants are
/// considered. An unknown parent yields no issues.
pub fn get_next_issues(issues: &[Issue], parent_filter: Option<&IssueId>) -> Vec<Issue> {
    let graph = build_graph(issues);
    let scope = parent_filter.map(|parent| {
        let mut scope = graph.descendants(parent);
        if graph.contains(parent) {
            scope.insert(parent.clone());
        }
        scope
    });

    // Input order is the final tie-break
    let mut seen = std::collections::HashSet::new();
    let mut next: Vec<Issue> = issues
        .iter()
        .filter(|issue| seen.insert(&issue.id))
        .filter(|issue| scope.as_ref().map_or(true, |s| s.contains(&issue.id)))
        .filter_map(|issue| graph.get(&issue.id))
        .filter(|node| is_actionable(node))
        .map(|node| node.issue.clone())
        .collect();

    next.sort_by(compare_candidates);
    next
}

fn status_rank(status: IssueStatus) -> u8 {
    match status {
        IssueStatus::Review => 0,
        _ => 1,
    }
}

/// Review before open, described before bare, lower priority number first
/// (unset last), then title
fn compare_candidates(a: &Issue, b: &Issue) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| b.has_description().cmp(&a.has_description()))
        .then_with(|| match (a.priority, b.priority) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.title.cmp(&b.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::issue::{ExecutionMode, ParentIssueRef};

    fn key(s: &str) -> IssueId {
        s.parse().unwrap()
    }

    fn issue(id: &str) -> Issue {
        Issue::new(key(id), id)
    }

    fn child(id: &str, parent: &str, order: &str) -> Issue {
        let mut i = issue(id);
        i.parent_issues.push(ParentIssueRef::new(key(parent), order));
        i
    }

    fn with_mode(id: &str, mode: ExecutionMode) -> Issue {
        let mut i = issue(id);
        i.execution_mode = mode;
        i
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn empty_input_has_no_next() {
        assert!(get_next_issues(&[], None).is_empty());
    }

    #[test]
    fn single_open_issue_is_next() {
        assert_eq!(ids(&get_next_issues(&[issue("a")], None)), vec!["a"]);
    }

    #[test]
    fn only_open_and_review_qualify() {
        let issues: Vec<Issue> = IssueStatus::ALL
            .into_iter()
            .map(|status| {
                let mut i = issue(status.as_str());
                i.status = status;
                i
            })
            .collect();
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["review", "open"]);
    }

    #[test]
    fn ideas_are_never_next() {
        let mut idea = issue("idea");
        idea.issue_type = IssueType::Idea;
        assert!(get_next_issues(&[idea], None).is_empty());
    }

    #[test]
    fn series_children_come_one_at_a_time() {
        let mut issues = vec![
            with_mode("p", ExecutionMode::Series),
            child("c1", "p", "aaa"),
            child("c2", "p", "bbb"),
        ];
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["c1"]);

        issues[1].status = IssueStatus::Complete;
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["c2"]);
    }

    #[test]
    fn parallel_children_are_all_next() {
        let issues = vec![
            with_mode("p", ExecutionMode::Parallel),
            child("c1", "p", "a"),
            child("c2", "p", "b"),
        ];
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["c1", "c2"]);
    }

    #[test]
    fn parent_becomes_next_after_children_finish() {
        let mut issues = vec![with_mode("p", ExecutionMode::Parallel), child("c", "p", "a")];
        issues[1].status = IssueStatus::Closed;
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["p"]);
    }

    #[test]
    fn idea_child_does_not_block_its_siblings_forever() {
        let mut idea = child("idea", "p", "a");
        idea.issue_type = IssueType::Idea;
        let issues = vec![with_mode("p", ExecutionMode::Parallel), idea, child("real", "p", "b")];
        assert_eq!(ids(&get_next_issues(&issues, None)), vec!["real"]);
    }

    #[test]
    fn explicit_previous_blocks() {
        let mut b = issue("b");
        b.previous_issues.push(key("a"));
        assert_eq!(ids(&get_next_issues(&[issue("a"), b], None)), vec!["a"]);
    }

    #[test]
    fn dangling_previous_does_not_block() {
        let mut b = issue("b");
        b.previous_issues.push(key("ghost"));
        assert_eq!(ids(&get_next_issues(&[b], None)), vec!["b"]);
    }

    #[test]
    fn parent_filter_limits_to_subtree() {
        let issues = vec![
            with_mode("p", ExecutionMode::Parallel),
            child("c1", "p", "a"),
            child("g1", "c1", "a"),
            issue("elsewhere"),
        ];
        assert_eq!(ids(&get_next_issues(&issues, Some(&key("P")))), vec!["g1"]);
        assert!(get_next_issues(&issues, Some(&key("unknown"))).is_empty());
    }

    #[test]
    fn parent_filter_includes_the_parent_itself() {
        let issues = vec![issue("solo"), issue("other")];
        assert_eq!(ids(&get_next_issues(&issues, Some(&key("solo")))), vec!["solo"]);
    }

    #[test]
    fn ordering_prefers_review_description_priority_title() {
        let mut review = issue("r");
        review.status = IssueStatus::Review;
        review.title = "zzz".to_string();

        let mut described = issue("d");
        described.description = Some("has details".to_string());
        described.title = "yyy".to_string();

        let mut urgent = issue("u");
        urgent.priority = Some(1);
        urgent.title = "xxx".to_string();

        let mut later = issue("l");
        later.priority = Some(5);
        later.title = "aaa".to_string();

        let mut unprioritized_b = issue("nb");
        unprioritized_b.title = "Bravo".to_string();
        let mut unprioritized_a = issue("na");
        unprioritized_a.title = "Alpha".to_string();

        let issues = vec![
            unprioritized_b,
            later,
            unprioritized_a,
            urgent,
            described,
            review,
        ];
        assert_eq!(
            ids(&get_next_issues(&issues, None)),
            vec!["r", "d", "u", "l", "na", "nb"]
        );
    }

    #[test]
    fn title_ordering_is_ordinal() {
        let mut lower = issue("lower");
        lower.title = "apple".to_string();
        let mut upper = issue("upper");
        upper.title = "Banana".to_string();
        // Uppercase sorts before lowercase in ordinal order
        assert_eq!(ids(&get_next_issues(&[lower, upper], None)), vec!["upper", "lower"]);
    }

    #[test]
    fn whitespace_description_counts_as_absent() {
        let mut blank = issue("blank");
        blank.description = Some("  ".to_string());
        blank.title = "a".to_string();
        let mut real = issue("real");
        real.description = Some("text".to_string());
        real.title = "b".to_string();
        assert_eq!(ids(&get_next_issues(&[blank, real], None)), vec!["real", "blank"]);
    }
}
