//! Project management
//!
//! Handles project initialization and provides access to the issue store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use super::{Config, IssueStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a strand project. Run 'strand init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

const DEFAULT_CONFIG: &str = r#"# strand configuration

# Execution mode for new issues: "series" or "parallel"
default_execution_mode = "series"

# Type for new issues: task, bug, chore, feature or idea
default_issue_type = "task"

# References shorter than this must match an issue ID exactly
min_prefix_length = 3
"#;

const GITIGNORE: &str = r#"# Temporary files left by interrupted writes
*.tmp
"#;

/// A strand project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let strand_dir = root.join(".strand");

        if !strand_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing files are left untouched, so running it twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let strand_dir = root.join(".strand");

        fs::create_dir_all(&strand_dir)
            .map_err(|e| ProjectError::CreateFailed(e.to_string()))
            .with_context(|| format!("Failed to create {}", strand_dir.display()))?;

        let config_path = strand_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = strand_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let store = IssueStore::for_project(&root);
        if !store.path().exists() {
            store.write_all(&[])?;
        }

        info!(root = %root.display(), "initialized project");
        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .strand directory path
    pub fn strand_dir(&self) -> PathBuf {
        self.root.join(".strand")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the issue store
    pub fn issue_store(&self) -> IssueStore {
        IssueStore::for_project(&self.root)
    }
}
