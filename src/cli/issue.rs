//! Issue CLI commands

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use super::output::Output;
use crate::domain::{
    add_dependency_with, build_graph, is_actionable, query_graph, resolve_issue, ExecutionMode,
    GraphFilter, Issue, IssueId, IssueStatus, IssueType, Position,
};
use crate::storage::Project;

#[derive(Args)]
pub struct CreateArgs {
    /// Issue title
    pub title: String,

    /// Issue type (task, bug, chore, feature, idea)
    #[arg(long = "type")]
    pub issue_type: Option<IssueType>,

    /// Initial status
    #[arg(long)]
    pub status: Option<IssueStatus>,

    /// How the issue's children are run
    #[arg(long)]
    pub mode: Option<ExecutionMode>,

    /// Priority (lower numbers first)
    #[arg(long)]
    pub priority: Option<i32>,

    /// Longer description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Assignee
    #[arg(long)]
    pub assign: Option<String>,

    /// Linked pull request number
    #[arg(long)]
    pub pr: Option<u64>,

    /// Parent issue; the new issue becomes its last child
    #[arg(long)]
    pub parent: Option<String>,

    /// Issue that must finish first (repeatable)
    #[arg(long = "previous")]
    pub previous: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only these statuses (repeatable)
    #[arg(long)]
    pub status: Vec<IssueStatus>,

    /// Only these types (repeatable)
    #[arg(long = "type")]
    pub issue_type: Vec<IssueType>,

    /// Only issues carrying one of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Only issues assigned to this person
    #[arg(long)]
    pub assigned: Option<String>,

    /// Only issues with this priority
    #[arg(long)]
    pub priority: Option<i32>,

    /// Only issues linked to this pull request
    #[arg(long)]
    pub pr: Option<u64>,

    /// Case-insensitive text search over ID, title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Only this issue and its descendants
    #[arg(long)]
    pub root: Option<String>,

    /// Include completed, archived, closed and deleted issues
    #[arg(long)]
    pub all: bool,

    /// Include finished issues that still have unfinished descendants
    #[arg(long)]
    pub with_active_descendants: bool,
}

pub fn create(output: &Output, args: CreateArgs) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.issue_store();
    let settings = &project.config().project;
    let min_prefix = settings.min_prefix_length;

    let mut issues = store.load_all()?;

    let mut id = IssueId::generate(&args.title, Utc::now());
    while issues.iter().any(|i| i.id == id) {
        id = IssueId::generate(&args.title, Utc::now());
    }

    let mut issue = Issue::new(id.clone(), args.title);
    issue.issue_type = args.issue_type.unwrap_or(settings.default_issue_type);
    issue.execution_mode = args.mode.unwrap_or(settings.default_execution_mode);
    issue.status = args.status.unwrap_or_default();
    issue.priority = args.priority;
    issue.description = args.description;
    issue.tags = args.tags;
    issue.assigned_to = args.assign;
    issue.linked_pr = args.pr;

    for reference in &args.previous {
        let previous = resolve_issue(&issues, reference, min_prefix)?;
        issue.add_previous(previous.id.clone());
    }

    issues.push(issue);
    let issue = match &args.parent {
        Some(parent) => {
            output.verbose_ctx("create", &format!("Attaching to parent: {}", parent));
            add_dependency_with(&issues, parent, id.as_str(), &Position::Last, min_prefix)?
        }
        None => issues.swap_remove(issues.len() - 1),
    };

    store.append(&issue)?;

    if output.is_json() {
        output.data(&issue);
    } else {
        output.success(&format!("Created issue: {} - {}", issue.id, issue.title));
    }

    Ok(())
}

pub fn list(output: &Output, args: ListArgs) -> Result<()> {
    let project = Project::open_current()?;
    let issues = project.issue_store().load_all()?;
    let min_prefix = project.config().project.min_prefix_length;

    let root_issue_id = match &args.root {
        Some(reference) => Some(resolve_issue(&issues, reference, min_prefix)?.id.clone()),
        None => None,
    };

    let filter = GraphFilter {
        statuses: args.status,
        types: args.issue_type,
        tags: args.tags,
        assigned_to: args.assigned,
        priority: args.priority,
        linked_pr: args.pr,
        search_text: args.search,
        root_issue_id,
        include_terminal: args.all,
        include_inactive_with_active_descendants: args.with_active_descendants,
    };

    let graph = query_graph(&issues, &filter);
    output.verbose_ctx("list", &format!("{} of {} issues match", graph.len(), issues.len()));

    let listed: Vec<&Issue> = graph_order(&issues, |id| graph.contains(id));

    if output.is_json() {
        output.data(&listed);
    } else if listed.is_empty() {
        println!("No issues");
    } else {
        println!("{:<10} {:<10} {:<8} TITLE", "ID", "STATUS", "TYPE");
        println!("{}", "-".repeat(60));
        for issue in listed {
            println!(
                "{:<10} {:<10} {:<8} {}",
                issue.id, issue.status, issue.issue_type, issue.title
            );
        }
    }

    Ok(())
}

/// Issues accepted by `keep`, in file order, each ID once
fn graph_order<'a>(issues: &'a [Issue], keep: impl Fn(&IssueId) -> bool) -> Vec<&'a Issue> {
    let mut seen = std::collections::HashSet::new();
    issues
        .iter()
        .filter(|issue| keep(&issue.id) && seen.insert(&issue.id))
        .collect()
}

#[derive(Serialize)]
struct IssueDetails<'a> {
    #[serde(flatten)]
    issue: &'a Issue,
    children: &'a [IssueId],
    previous: &'a [IssueId],
    next: &'a [IssueId],
    is_actionable: bool,
}

pub fn show(output: &Output, reference: &str) -> Result<()> {
    let project = Project::open_current()?;
    let issues = project.issue_store().load_all()?;
    let issue = resolve_issue(&issues, reference, project.config().project.min_prefix_length)?;

    let graph = build_graph(&issues);
    let Some(node) = graph.get(&issue.id) else {
        anyhow::bail!("Issue not found: {}", reference);
    };

    let details = IssueDetails {
        issue: &node.issue,
        children: &node.child_issue_ids,
        previous: &node.previous_issue_ids,
        next: &node.next_issue_ids,
        is_actionable: is_actionable(node),
    };

    if output.is_json() {
        output.data(&details);
        return Ok(());
    }

    let issue = details.issue;
    println!("{} - {}", issue.id, issue.title);
    println!("Status:     {}", issue.status);
    println!("Type:       {}", issue.issue_type);
    println!("Mode:       {}", issue.execution_mode);
    if let Some(priority) = issue.priority {
        println!("Priority:   {}", priority);
    }
    if let Some(assignee) = &issue.assigned_to {
        println!("Assigned:   {}", assignee);
    }
    if let Some(pr) = issue.linked_pr {
        println!("PR:         #{}", pr);
    }
    if !issue.tags.is_empty() {
        println!("Tags:       {}", issue.tags.join(", "));
    }
    println!("Actionable: {}", if details.is_actionable { "yes" } else { "no" });

    if !issue.parent_issues.is_empty() {
        println!();
        println!("Parents:");
        for parent in &issue.parent_issues {
            println!("  {} (order {})", parent.parent_issue_id, parent.sort_order);
        }
    }
    print_ids("Children", details.children);
    print_ids("Previous", details.previous);
    print_ids("Next", details.next);

    if let Some(description) = issue.description.as_deref().filter(|d| !d.trim().is_empty()) {
        println!();
        println!("{}", description);
    }

    Ok(())
}

fn print_ids(label: &str, ids: &[IssueId]) {
    if ids.is_empty() {
        return;
    }
    println!();
    println!("{}:", label);
    for id in ids {
        println!("  {}", id);
    }
}

pub fn set_status(output: &Output, reference: &str, status: IssueStatus) -> Result<()> {
    update(output, reference, |issue| issue.set_status(status))
}

pub fn set_mode(output: &Output, reference: &str, mode: ExecutionMode) -> Result<()> {
    update(output, reference, |issue| issue.set_execution_mode(mode))
}

/// Resolves an issue, applies `change` and persists the result
fn update(output: &Output, reference: &str, change: impl FnOnce(&mut Issue)) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.issue_store();
    let issues = store.load_all()?;

    let mut issue = resolve_issue(&issues, reference, project.config().project.min_prefix_length)?
        .clone();
    change(&mut issue);
    store.upsert(&issue)?;

    if output.is_json() {
        output.data(&issue);
    } else {
        output.success(&format!(
            "Updated {}: status {}, mode {}",
            issue.id, issue.status, issue.execution_mode
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_order_keeps_file_order_and_dedups() {
        let issues = vec![
            Issue::new("b".parse().unwrap(), "B"),
            Issue::new("a".parse().unwrap(), "A"),
            Issue::new("B".parse().unwrap(), "B again"),
            Issue::new("c".parse().unwrap(), "C"),
        ];
        let kept = graph_order(&issues, |id| !id.matches("c"));
        let titles: Vec<_> = kept.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }
}
