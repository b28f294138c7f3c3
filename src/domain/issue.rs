//! Issue domain model
//!
//! Issues are the units of work tracked by strand. They form a DAG through
//! parent references (each carrying a fractional sort key that orders the
//! issue among its siblings) and through explicit "previous" blocking links.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::IssueId;

/// Status of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Draft,
    #[default]
    Open,
    Progress,
    Review,
    Complete,
    Archived,
    Closed,
    Deleted,
}

impl IssueStatus {
    /// All statuses in lifecycle order
    pub const ALL: [IssueStatus; 8] = [
        IssueStatus::Draft,
        IssueStatus::Open,
        IssueStatus::Progress,
        IssueStatus::Review,
        IssueStatus::Complete,
        IssueStatus::Archived,
        IssueStatus::Closed,
        IssueStatus::Deleted,
    ];

    /// Returns true if this status counts as "done" for precedence purposes
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IssueStatus::Complete | IssueStatus::Archived | IssueStatus::Closed | IssueStatus::Deleted
        )
    }

    /// Returns true if an issue in this status may be picked up
    pub fn is_workable(&self) -> bool {
        matches!(self, IssueStatus::Open | IssueStatus::Review)
    }

    /// Returns the lowercase label used in files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Draft => "draft",
            IssueStatus::Open => "open",
            IssueStatus::Progress => "progress",
            IssueStatus::Review => "review",
            IssueStatus::Complete => "complete",
            IssueStatus::Archived => "archived",
            IssueStatus::Closed => "closed",
            IssueStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// Kind of work an issue represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Chore,
    Feature,
    /// Not yet committed work; never actionable
    Idea,
}

impl IssueType {
    pub const ALL: [IssueType; 5] = [
        IssueType::Task,
        IssueType::Bug,
        IssueType::Chore,
        IssueType::Feature,
        IssueType::Idea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Task => "task",
            IssueType::Bug => "bug",
            IssueType::Chore => "chore",
            IssueType::Feature => "feature",
            IssueType::Idea => "idea",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown issue type '{}'", s))
    }
}

/// How the children of an issue are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Children complete one at a time, in sort order
    #[default]
    Series,
    /// Children may be worked on simultaneously
    Parallel,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Series => "series",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" => Ok(ExecutionMode::Series),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// A link from a child issue to one of its parents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentIssueRef {
    /// The parent issue
    pub parent_issue_id: IssueId,

    /// Fractional key ordering this child among the parent's children
    #[serde(default)]
    pub sort_order: String,
}

impl ParentIssueRef {
    pub fn new(parent_issue_id: IssueId, sort_order: impl Into<String>) -> Self {
        Self {
            parent_issue_id,
            sort_order: sort_order.into(),
        }
    }
}

/// An issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,

    pub title: String,

    #[serde(default)]
    pub status: IssueStatus,

    #[serde(rename = "type", default)]
    pub issue_type: IssueType,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_issues: Vec<ParentIssueRef>,

    /// Explicit blocking predecessors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_issues: Vec<IssueId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_pr: Option<u64>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Creates an open task with the given ID and title
    pub fn new(id: IssueId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            status: IssueStatus::Open,
            issue_type: IssueType::Task,
            execution_mode: ExecutionMode::Series,
            parent_issues: Vec::new(),
            previous_issues: Vec::new(),
            priority: None,
            description: None,
            tags: Vec::new(),
            assigned_to: None,
            linked_pr: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the description has non-whitespace content
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Returns the parent reference pointing at `parent`, if any
    pub fn parent_ref(&self, parent: &IssueId) -> Option<&ParentIssueRef> {
        self.parent_issues
            .iter()
            .find(|r| &r.parent_issue_id == parent)
    }

    /// Returns true if this issue lists `parent` among its parents
    pub fn has_parent(&self, parent: &IssueId) -> bool {
        self.parent_ref(parent).is_some()
    }

    pub fn set_status(&mut self, status: IssueStatus) {
        if self.status != status {
            self.status = status;
            self.touch();
        }
    }

    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        if self.execution_mode != mode {
            self.execution_mode = mode;
            self.touch();
        }
    }

    /// Appends a parent reference
    pub fn add_parent(&mut self, parent_ref: ParentIssueRef) {
        self.parent_issues.push(parent_ref);
        self.touch();
    }

    /// Removes the first reference to `parent`, returning true if one existed
    pub fn remove_parent(&mut self, parent: &IssueId) -> bool {
        match self
            .parent_issues
            .iter()
            .position(|r| &r.parent_issue_id == parent)
        {
            Some(pos) => {
                self.parent_issues.remove(pos);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Adds an explicit blocking predecessor
    pub fn add_previous(&mut self, previous: IssueId) {
        if !self.previous_issues.contains(&previous) {
            self.previous_issues.push(previous);
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
