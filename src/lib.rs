//! Strand - a local-first issue tracker with dependency scheduling
//!
//! Issues form a DAG through ordered parent links. Each parent runs its
//! children in series or in parallel, which drives what is actionable next
//! and how the graph is laid out for display.

pub mod domain;
pub mod storage;
pub mod cli;
pub mod logging;

pub use domain::{
    ExecutionMode, Issue, IssueGraph, IssueId, IssueStatus, IssueType, ParentIssueRef,
    TaskGraphLayout,
};
