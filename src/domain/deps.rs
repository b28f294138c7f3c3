//! Parent/child dependency editing
//!
//! Adds and removes parent links on a snapshot of issues. Every check runs
//! before anything changes: the functions return an updated copy of the
//! child and leave persisting it to the caller.

use thiserror::Error;
use tracing::debug;

use super::cycles::would_create_cycle;
use super::id::IssueId;
use super::issue::{Issue, ParentIssueRef};
use super::sort_key::{key_between, SortKeyError};

/// References shorter than this must match an ID exactly
pub const DEFAULT_MIN_PREFIX_LEN: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum DependencyError {
    #[error("Issue not found: {0}")]
    NotFound(String),

    #[error("Ambiguous issue reference '{reference}' matches: {}", format_ids(.matches))]
    Ambiguous {
        reference: String,
        matches: Vec<IssueId>,
    },

    #[error("{child} is already a child of {parent}")]
    AlreadyChild { parent: IssueId, child: IssueId },

    #[error("Adding {child} under {parent} would create a circular dependency")]
    CircularDependency { parent: IssueId, child: IssueId },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: IssueId, child: IssueId },

    #[error(transparent)]
    SortKey(#[from] SortKeyError),
}

impl DependencyError {
    /// True for rejected edits, as opposed to unresolvable references
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            DependencyError::AlreadyChild { .. }
                | DependencyError::CircularDependency { .. }
                | DependencyError::NotAChild { .. }
                | DependencyError::SortKey(_)
        )
    }
}

fn format_ids(ids: &[IssueId]) -> String {
    ids.iter()
        .map(IssueId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where a new child goes among its siblings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Position {
    First,
    #[default]
    Last,
    /// Directly after the referenced sibling
    After(String),
    /// Directly before the referenced sibling
    Before(String),
}

/// Resolves an ID or ID prefix against a snapshot
///
/// References shorter than `min_prefix_len` must match exactly. Longer ones
/// may be any unique prefix; an exact match always wins over prefix matches.
pub fn resolve_issue<'a>(
    issues: &'a [Issue],
    reference: &str,
    min_prefix_len: usize,
) -> Result<&'a Issue, DependencyError> {
    let reference = reference.trim();

    if let Some(exact) = issues.iter().find(|i| i.id.matches(reference)) {
        return Ok(exact);
    }
    if reference.is_empty() || reference.len() < min_prefix_len {
        return Err(DependencyError::NotFound(reference.to_string()));
    }

    let mut matches: Vec<&Issue> = Vec::new();
    for issue in issues {
        if issue.id.starts_with_ignore_case(reference) && !matches.iter().any(|m| m.id == issue.id) {
            matches.push(issue);
        }
    }

    match matches.as_slice() {
        [] => Err(DependencyError::NotFound(reference.to_string())),
        [only] => Ok(*only),
        _ => Err(DependencyError::Ambiguous {
            reference: reference.to_string(),
            matches: matches.iter().map(|m| m.id.clone()).collect(),
        }),
    }
}

/// Sibling sort keys under `parent`, ascending, ties in input order
fn sibling_keys<'a>(issues: &'a [Issue], parent: &IssueId) -> Vec<(&'a IssueId, &'a str)> {
    let mut keys: Vec<(&IssueId, &str)> = issues
        .iter()
        .filter_map(|issue| {
            issue
                .parent_ref(parent)
                .map(|r| (&issue.id, r.sort_order.as_str()))
        })
        .collect();
    keys.sort_by(|a, b| a.1.cmp(b.1));
    keys
}

/// Computes the sort key for a new child of `parent` at `position`
///
/// Siblings tied with the anchor of `After`/`Before` are skipped, so the new
/// key lands past the whole run of equal keys. When nothing sorts below the
/// first sibling the new child shares its key and input order decides.
fn allocate_sort_key(
    issues: &[Issue],
    parent: &IssueId,
    position: &Position,
    min_prefix_len: usize,
) -> Result<String, DependencyError> {
    let siblings = sibling_keys(issues, parent);

    let (lower, upper) = match position {
        Position::Last => (siblings.last().map(|s| s.1), None),
        Position::First => (None, siblings.first().map(|s| s.1)),
        Position::After(reference) | Position::Before(reference) => {
            let sibling = resolve_issue(issues, reference, min_prefix_len)?;
            let Some(at) = siblings.iter().position(|s| *s.0 == sibling.id) else {
                return Err(DependencyError::NotAChild {
                    parent: parent.clone(),
                    child: sibling.id.clone(),
                });
            };
            let anchor = siblings[at].1;
            if matches!(position, Position::After(_)) {
                let upper = siblings[at + 1..].iter().map(|s| s.1).find(|k| *k > anchor);
                (Some(anchor), upper)
            } else {
                let lower = siblings[..at].iter().rev().map(|s| s.1).find(|k| *k < anchor);
                (lower, Some(anchor))
            }
        }
    };

    match key_between(lower, upper) {
        Err(SortKeyError::NoRoom { .. }) if lower.is_none() => {
            Ok(upper.unwrap_or_default().to_string())
        }
        result => Ok(result?),
    }
}

/// Makes `parent_ref` a parent of `child_ref`, returning the updated child
pub fn add_dependency(
    issues: &[Issue],
    parent_ref: &str,
    child_ref: &str,
    position: &Position,
) -> Result<Issue, DependencyError> {
    add_dependency_with(issues, parent_ref, child_ref, position, DEFAULT_MIN_PREFIX_LEN)
}

/// [`add_dependency`] with a configurable exact-match threshold
pub fn add_dependency_with(
    issues: &[Issue],
    parent_ref: &str,
    child_ref: &str,
    position: &Position,
    min_prefix_len: usize,
) -> Result<Issue, DependencyError> {
    let parent = resolve_issue(issues, parent_ref, min_prefix_len)?;
    let child = resolve_issue(issues, child_ref, min_prefix_len)?;

    if child.has_parent(&parent.id) {
        return Err(DependencyError::AlreadyChild {
            parent: parent.id.clone(),
            child: child.id.clone(),
        });
    }
    if would_create_cycle(issues, &parent.id, &child.id) {
        return Err(DependencyError::CircularDependency {
            parent: parent.id.clone(),
            child: child.id.clone(),
        });
    }

    let sort_order = allocate_sort_key(issues, &parent.id, position, min_prefix_len)?;
    debug!(parent = %parent.id, child = %child.id, sort_order = %sort_order, "adding dependency");

    let mut updated = child.clone();
    updated.add_parent(ParentIssueRef::new(parent.id.clone(), sort_order));
    Ok(updated)
}

/// Detaches `child_ref` from `parent_ref`, returning the updated child
pub fn remove_dependency(
    issues: &[Issue],
    parent_ref: &str,
    child_ref: &str,
) -> Result<Issue, DependencyError> {
    remove_dependency_with(issues, parent_ref, child_ref, DEFAULT_MIN_PREFIX_LEN)
}

/// [`remove_dependency`] with a configurable exact-match threshold
pub fn remove_dependency_with(
    issues: &[Issue],
    parent_ref: &str,
    child_ref: &str,
    min_prefix_len: usize,
) -> Result<Issue, DependencyError> {
    let parent = resolve_issue(issues, parent_ref, min_prefix_len)?;
    let child = resolve_issue(issues, child_ref, min_prefix_len)?;

    let mut updated = child.clone();
    if !updated.remove_parent(&parent.id) {
        return Err(DependencyError::NotAChild {
            parent: parent.id.clone(),
            child: child.id.clone(),
        });
    }
    debug!(parent = %parent.id, child = %child.id, "removed dependency");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn order_under<'a>(issue: &'a Issue, parent: &str) -> &'a str {
        &issue.parent_ref(&key(parent)).unwrap().sort_order
    }

    #[test]
    fn resolve_exact_short_reference() {
        let issues = vec![issue("ab"), issue("abc123")];
        assert_eq!(resolve_issue(&issues, "AB", 3).unwrap().id.as_str(), "ab");
    }

    #[test]
    fn short_reference_needs_exact_match() {
        let issues = vec![issue("abc123")];
        assert_eq!(
            resolve_issue(&issues, "ab", 3),
            Err(DependencyError::NotFound("ab".to_string()))
        );
    }

    #[test]
    fn resolve_unique_prefix() {
        let issues = vec![issue("abc123"), issue("def456")];
        assert_eq!(resolve_issue(&issues, "ABC", 3).unwrap().id.as_str(), "abc123");
    }

    #[test]
    fn ambiguous_prefix() {
        let issues = vec![issue("abc123"), issue("abc999")];
        let err = resolve_issue(&issues, "abc", 3).unwrap_err();
        assert!(matches!(err, DependencyError::Ambiguous { ref matches, .. } if matches.len() == 2));
        assert!(err.to_string().contains("abc123, abc999"));
    }

    #[test]
    fn exact_match_beats_prefix() {
        let issues = vec![issue("abc"), issue("abcdef")];
        assert_eq!(resolve_issue(&issues, "abc", 3).unwrap().id.as_str(), "abc");
    }

    #[test]
    fn add_to_empty_parent() {
        let issues = vec![issue("parent"), issue("kid")];
        let updated = add_dependency(&issues, "parent", "kid", &Position::Last).unwrap();
        assert_eq!(updated.id.as_str(), "kid");
        assert_eq!(order_under(&updated, "parent"), "i");
    }

    #[test]
    fn add_last_and_first() {
        let issues = vec![
            issue("p"),
            child("a", "p", "b"),
            child("z", "p", "y"),
            issue("new"),
        ];
        let last = add_dependency(&issues, "p", "new", &Position::Last).unwrap();
        assert!(order_under(&last, "p") > "y");

        let first = add_dependency(&issues, "p", "new", &Position::First).unwrap();
        assert!(order_under(&first, "p") < "b");
    }

    #[test]
    fn add_after_and_before_sibling() {
        let issues = vec![
            issue("p"),
            child("one", "p", "b"),
            child("two", "p", "d"),
            child("three", "p", "f"),
            issue("new"),
        ];

        let after = add_dependency(&issues, "p", "new", &Position::After("two".into())).unwrap();
        let key = order_under(&after, "p");
        assert!(key > "d" && key < "f");

        let before = add_dependency(&issues, "p", "new", &Position::Before("one".into())).unwrap();
        assert!(order_under(&before, "p") < "b");

        let after_last =
            add_dependency(&issues, "p", "new", &Position::After("three".into())).unwrap();
        assert!(order_under(&after_last, "p") > "f");
    }

    #[test]
    fn after_skips_siblings_with_the_same_key() {
        let issues = vec![
            issue("p"),
            child("a", "p", "m"),
            child("b", "p", "m"),
            child("c", "p", "q"),
            issue("new"),
        ];
        let after = add_dependency(&issues, "p", "new", &Position::After("a".into())).unwrap();
        let key = order_under(&after, "p");
        assert!(key > "m" && key < "q", "{key}");

        let before = add_dependency(&issues, "p", "new", &Position::Before("c".into())).unwrap();
        let key = order_under(&before, "p");
        assert!(key > "m" && key < "q", "{key}");
    }

    #[test]
    fn after_a_tied_last_run_goes_past_it() {
        let issues = vec![issue("p"), child("a", "p", "m"), child("b", "p", "m"), issue("new")];
        let after = add_dependency(&issues, "p", "new", &Position::After("a".into())).unwrap();
        assert!(order_under(&after, "p") > "m");
    }

    #[test]
    fn first_below_an_empty_key_shares_it() {
        let issues = vec![issue("p"), child("a", "p", ""), issue("new")];
        let first = add_dependency(&issues, "p", "new", &Position::First).unwrap();
        assert_eq!(order_under(&first, "p"), "");

        let last = add_dependency(&issues, "p", "new", &Position::Last).unwrap();
        assert!(order_under(&last, "p") > "");
    }

    #[test]
    fn uppercase_sibling_keys_are_accepted() {
        let issues = vec![issue("p"), child("a", "p", "M"), child("b", "p", "Q"), issue("new")];

        let last = add_dependency(&issues, "p", "new", &Position::Last).unwrap();
        assert!(order_under(&last, "p") > "Q");

        let first = add_dependency(&issues, "p", "new", &Position::First).unwrap();
        assert!(order_under(&first, "p") < "M");

        let after = add_dependency(&issues, "p", "new", &Position::After("a".into())).unwrap();
        let key = order_under(&after, "p");
        assert!(key > "M" && key < "Q", "{key}");
    }

    #[test]
    fn sibling_must_belong_to_parent() {
        let issues = vec![issue("p"), issue("stranger"), issue("new")];
        let err = add_dependency(&issues, "p", "new", &Position::After("stranger".into()))
            .unwrap_err();
        assert!(matches!(err, DependencyError::NotAChild { .. }));
        assert!(err.is_invalid_operation());
    }

    #[test]
    fn duplicate_link_rejected() {
        let issues = vec![issue("p"), child("c", "p", "a")];
        let err = add_dependency(&issues, "p", "c", &Position::Last).unwrap_err();
        assert!(matches!(err, DependencyError::AlreadyChild { .. }));
        assert!(err.to_string().contains("already a child"));
    }

    #[test]
    fn cycle_rejected() {
        let issues = vec![issue("top"), child("mid", "top", "a"), child("low", "mid", "a")];
        let err = add_dependency(&issues, "low", "top", &Position::Last).unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }));
        assert!(err.to_string().contains("circular dependency"));
    }

    #[test]
    fn self_link_rejected() {
        let issues = vec![issue("solo")];
        let err = add_dependency(&issues, "solo", "solo", &Position::Last).unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }));
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let issues = vec![issue("p")];
        let err = add_dependency(&issues, "p", "missing", &Position::Last).unwrap_err();
        assert_eq!(err, DependencyError::NotFound("missing".to_string()));
        assert!(!err.is_invalid_operation());
    }

    #[test]
    fn add_keeps_existing_parents() {
        let issues = vec![issue("p1"), issue("p2"), child("c", "p1", "a")];
        let updated = add_dependency(&issues, "p2", "c", &Position::Last).unwrap();
        assert_eq!(updated.parent_issues.len(), 2);
        assert_eq!(updated.parent_issues[0].parent_issue_id.as_str(), "p1");
    }

    #[test]
    fn remove_missing_link_fails() {
        let issues = vec![issue("p"), issue("c")];
        let err = remove_dependency(&issues, "p", "c").unwrap_err();
        assert!(matches!(err, DependencyError::NotAChild { .. }));
    }

    #[test]
    fn remove_preserves_other_parents() {
        let mut c = child("c", "p1", "a");
        c.parent_issues.push(ParentIssueRef::new(key("p2"), "b"));
        let issues = vec![issue("p1"), issue("p2"), c];

        let updated = remove_dependency(&issues, "P1", "c").unwrap();
        assert_eq!(updated.parent_issues.len(), 1);
        assert_eq!(updated.parent_issues[0].parent_issue_id.as_str(), "p2");
    }

    #[test]
    fn add_then_remove_round_trips() {
        let mut c = child("c", "p1", "a");
        c.parent_issues.push(ParentIssueRef::new(key("p2"), "b"));
        let mut issues = vec![issue("p1"), issue("p2"), issue("p3"), c];
        let before = issues[3].parent_issues.clone();

        issues[3] = add_dependency(&issues, "p3", "c", &Position::First).unwrap();
        issues[3] = remove_dependency(&issues, "p3", "c").unwrap();
        assert_eq!(issues[3].parent_issues, before);
    }
}
