//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Issue | Work item management | `create`, `list`, `show`, `set-status`, `mode` |
//! | Query | Scheduling views | `next`, `graph`, `check` |
//! | Dependency | Parent/child edits | `dep add`, `dep remove` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! strand --verbose next
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod issue;
mod query;
mod dep;

pub use app::{run, Cli, Commands, LogLevel};
pub use output::{Output, OutputFormat};
