//! Domain models and scheduling logic for strand
//!
//! Contains the core business logic without any I/O concerns. Every function
//! here works on an in-memory snapshot of issues and rebuilds what it needs
//! on each call.

mod id;
mod issue;
mod sort_key;
mod graph;
mod cycles;
mod next;
mod layout;
mod deps;

pub use id::{IdError, IssueId};
pub use issue::{ExecutionMode, Issue, IssueStatus, IssueType, ParentIssueRef};
pub use sort_key::{key_after, key_between, SortKeyError};
pub use graph::{build_graph, query_graph, GraphFilter, GraphNode, IssueGraph};
pub use cycles::{validate_cycles, would_create_cycle, CycleReport};
pub use next::{get_next_issues, is_actionable};
pub use layout::{build_task_graph_layout, LayoutNode, TaskGraphLayout};
pub use deps::{
    add_dependency, add_dependency_with, remove_dependency, remove_dependency_with,
    resolve_issue, DependencyError, Position, DEFAULT_MIN_PREFIX_LEN,
};
