//! Query commands (next, graph, check)

use anyhow::Result;

use super::output::Output;
use crate::domain::{
    build_task_graph_layout, get_next_issues, resolve_issue, validate_cycles, TaskGraphLayout,
};
use crate::storage::Project;

/// Show issues that can be worked on now
pub fn next(output: &Output, parent_filter: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    output.verbose_ctx(
        "next",
        &format!("Opened project at: {}", project.root().display()),
    );

    let issues = project.issue_store().load_all()?;
    let parent = match parent_filter {
        Some(reference) => Some(
            resolve_issue(&issues, reference, project.config().project.min_prefix_length)?
                .id
                .clone(),
        ),
        None => None,
    };

    let next = get_next_issues(&issues, parent.as_ref());
    output.verbose_ctx("next", &format!("Found {} actionable issues", next.len()));

    if output.is_json() {
        output.data(&next);
    } else if next.is_empty() {
        println!("No issues ready to work on.");
    } else {
        println!("Next issues ({}):", next.len());
        println!("{:<10} {:<8} {:<8} TITLE", "ID", "STATUS", "PRIORITY");
        println!("{}", "-".repeat(60));
        for issue in next {
            let priority = issue.priority.map(|p| p.to_string()).unwrap_or_default();
            println!(
                "{:<10} {:<8} {:<8} {}",
                issue.id, issue.status, priority, issue.title
            );
        }
    }

    Ok(())
}

/// Show the lane layout of the issue graph
pub fn graph(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let issues = project.issue_store().load_all()?;

    let layout = build_task_graph_layout(&issues);
    output.verbose_ctx(
        "graph",
        &format!("{} nodes across {} lanes", layout.nodes.len(), layout.total_lanes),
    );

    if output.is_json() {
        output.data(&layout);
    } else if layout.nodes.is_empty() {
        println!("No issues to show.");
    } else {
        for line in render_lanes(&layout) {
            println!("{}", line);
        }
    }

    Ok(())
}

/// One text line per row, indented by lane; `*` marks actionable issues
fn render_lanes(layout: &TaskGraphLayout) -> Vec<String> {
    layout
        .nodes
        .iter()
        .map(|node| {
            let marker = if node.is_actionable { '*' } else { 'o' };
            format!(
                "{}{} {} {}",
                "  ".repeat(node.lane),
                marker,
                node.issue.id,
                node.issue.title
            )
        })
        .collect()
}

/// Report circular dependencies; fails when any exist
pub fn check(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let issues = project.issue_store().load_all()?;

    let report = validate_cycles(&issues);

    if output.is_json() {
        output.data(&report);
    } else if report.is_valid {
        output.success(&format!("No circular dependencies among {} issues", issues.len()));
    } else {
        println!("Circular dependencies:");
        for cycle in &report.cycles {
            let path: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
            println!("  {}", path.join(" -> "));
        }
    }

    if !report.is_valid {
        anyhow::bail!("Found {} circular dependencies", report.cycles.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Issue, ParentIssueRef};

    #[test]
    fn render_indents_by_lane() {
        let parent = Issue::new("p".parse().unwrap(), "Parent");
        let mut child = Issue::new("c".parse().unwrap(), "Child");
        child
            .parent_issues
            .push(ParentIssueRef::new("p".parse().unwrap(), "a"));

        let layout = build_task_graph_layout(&[parent, child]);
        assert_eq!(
            render_lanes(&layout),
            vec!["* c Child".to_string(), "  o p Parent".to_string()]
        );
    }
}
