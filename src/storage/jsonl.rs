//! JSONL storage for issues
//!
//! Issues are stored in `.strand/issues.jsonl` with one JSON object per line.
//! File order is significant: it is the input order the scheduler uses to
//! break ties, so rewrites keep issues where they were.
//! Uses file locking for concurrent access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::debug;

use crate::domain::{Issue, IssueId};

/// Store for issue data in JSONL format
pub struct IssueStore {
    path: PathBuf,
}

impl IssueStore {
    /// Creates a new issue store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".strand").join("issues.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every issue in file order
    ///
    /// When an ID appears on several lines the last line wins, keeping the
    /// position of the first.
    pub fn load_all(&self) -> Result<Vec<Issue>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open issue store: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on issue store")?;

        let reader = BufReader::new(&file);
        let mut issues: Vec<Issue> = Vec::new();
        let mut positions: HashMap<IssueId, usize> = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let issue: Issue = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse issue at line {}", line_num + 1))?;

            match positions.get(&issue.id) {
                Some(&pos) => issues[pos] = issue,
                None => {
                    positions.insert(issue.id.clone(), issues.len());
                    issues.push(issue);
                }
            }
        }

        debug!(count = issues.len(), path = %self.path.display(), "loaded issues");
        // Lock is released when file is dropped
        Ok(issues)
    }

    /// Writes all issues to the store (full rewrite)
    pub fn write_all(&self, issues: &[Issue]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on issue store")?;

            let mut writer = BufWriter::new(&file);

            for issue in issues {
                let line = serde_json::to_string(issue).context("Failed to serialize issue")?;
                writeln!(writer, "{}", line).context("Failed to write issue")?;
            }

            writer.flush().context("Failed to flush issue store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Appends a single issue (used for quick adds without full rewrite)
    pub fn append(&self, issue: &Issue) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open issue store: {}", self.path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire write lock on issue store")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(issue).context("Failed to serialize issue")?;
        writeln!(writer, "{}", line).context("Failed to write issue")?;

        writer.flush().context("Failed to flush issue store")?;

        Ok(())
    }

    /// Replaces the issue with the same ID, or appends it if new
    pub fn upsert(&self, issue: &Issue) -> Result<()> {
        let mut issues = self.load_all()?;
        match issues.iter_mut().find(|existing| existing.id == issue.id) {
            Some(existing) => *existing = issue.clone(),
            None => issues.push(issue.clone()),
        }
        self.write_all(&issues)
    }
}
