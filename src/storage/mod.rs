//! # Storage Layer
//!
//! Persistence for strand projects in git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Issues | JSONL (one JSON per line) | `.strand/issues.jsonl` |
//! | Config | TOML | `.strand/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`IssueStore`] uses file locking (`fs2`) for concurrent access
//! - Full rewrites are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! .strand/
//! ├── issues.jsonl          # All issues, file order preserved
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores interrupted temp files
//! ```

mod config;
mod jsonl;
mod project;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use jsonl::IssueStore;
pub use project::{Project, ProjectError};
