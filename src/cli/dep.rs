//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{add_dependency_with, remove_dependency_with, Issue, Position};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make CHILD a child of PARENT
    ///
    /// Examples:
    ///   strand dep add 3f9a2c 81bd07               # Last child
    ///   strand dep add 3f9a2c 81bd07 --first       # First child
    ///   strand dep add 3f9a2c 81bd07 --after c44e1a
    Add {
        /// Parent issue ID or unique prefix
        parent: String,

        /// Child issue ID or unique prefix
        child: String,

        /// Place the child before all existing siblings
        #[arg(long, conflicts_with_all = ["after", "before"])]
        first: bool,

        /// Place the child directly after this sibling
        #[arg(long, conflicts_with = "before")]
        after: Option<String>,

        /// Place the child directly before this sibling
        #[arg(long)]
        before: Option<String>,
    },

    /// Detach CHILD from PARENT
    Remove {
        /// Parent issue ID or unique prefix
        parent: String,

        /// Child issue ID or unique prefix
        child: String,
    },
}

pub fn run(cmd: DepCommands, output: &Output) -> Result<()> {
    match cmd {
        DepCommands::Add {
            parent,
            child,
            first,
            after,
            before,
        } => {
            let position = position_from_flags(first, after, before);
            add(output, &parent, &child, &position)
        }
        DepCommands::Remove { parent, child } => remove(output, &parent, &child),
    }
}

fn position_from_flags(first: bool, after: Option<String>, before: Option<String>) -> Position {
    match (first, after, before) {
        (true, _, _) => Position::First,
        (_, Some(sibling), _) => Position::After(sibling),
        (_, _, Some(sibling)) => Position::Before(sibling),
        _ => Position::Last,
    }
}

fn add(output: &Output, parent: &str, child: &str, position: &Position) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.issue_store();
    let issues = store.load_all()?;
    let min_prefix = project.config().project.min_prefix_length;

    output.verbose_ctx("dep", &format!("Adding {} under {} at {:?}", child, parent, position));
    let updated = add_dependency_with(&issues, parent, child, position, min_prefix)?;
    store.upsert(&updated)?;

    report(output, &updated, "Added")
}

fn remove(output: &Output, parent: &str, child: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.issue_store();
    let issues = store.load_all()?;
    let min_prefix = project.config().project.min_prefix_length;

    let updated = remove_dependency_with(&issues, parent, child, min_prefix)?;
    store.upsert(&updated)?;

    report(output, &updated, "Removed")
}

fn report(output: &Output, updated: &Issue, verb: &str) -> Result<()> {
    if output.is_json() {
        output.data(updated);
    } else {
        let parents: Vec<String> = updated
            .parent_issues
            .iter()
            .map(|p| format!("{} ({})", p.parent_issue_id, p.sort_order))
            .collect();
        let parents = if parents.is_empty() {
            "none".to_string()
        } else {
            parents.join(", ")
        };
        output.success(&format!(
            "{} dependency. Parents of {}: {}",
            verb, updated.id, parents
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_positions() {
        assert_eq!(position_from_flags(false, None, None), Position::Last);
        assert_eq!(position_from_flags(true, None, None), Position::First);
        assert_eq!(
            position_from_flags(false, Some("x".into()), None),
            Position::After("x".into())
        );
        assert_eq!(
            position_from_flags(false, None, Some("y".into())),
            Position::Before("y".into())
        );
    }
}
