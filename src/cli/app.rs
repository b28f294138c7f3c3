//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{dep, issue, query};
use crate::domain::{ExecutionMode, IssueStatus};
use crate::logging;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "strand")]
#[command(author, version, about = "Local-first issue tracking with dependency scheduling")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level for diagnostics on stderr (overrides STRAND_LOG)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log levels accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new strand project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Create an issue
    ///
    /// Examples:
    ///   strand create "Fix login"                    # Root-level issue
    ///   strand create "Write tests" --parent 3f9a2c  # Last child of 3f9a2c
    Create(issue::CreateArgs),

    /// List issues
    List(issue::ListArgs),

    /// Show issue details
    Show {
        /// Issue ID or unique prefix
        id: String,
    },

    /// Change the status of an issue
    SetStatus {
        /// Issue ID or unique prefix
        id: String,

        /// New status
        status: IssueStatus,
    },

    /// Choose whether an issue's children run in series or parallel
    Mode {
        /// Issue ID or unique prefix
        id: String,

        /// Execution mode for the children
        mode: ExecutionMode,
    },

    /// Show issues that can be worked on now, best first
    Next {
        /// Only consider this issue and its descendants
        #[arg(long)]
        parent: Option<String>,
    },

    /// Show the issue graph laid out in lanes
    Graph,

    /// Check the issue graph for circular dependencies
    Check,

    /// Manage parent/child dependencies
    #[command(subcommand)]
    Dep(dep::DepCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level, cli.verbose)?;

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("strand starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .strand directory at: {}", project.strand_dir().display()),
            );
            output.success(&format!(
                "Initialized strand project at {}",
                project.root().display()
            ));
        }

        Commands::Create(args) => issue::create(&output, args)?,
        Commands::List(args) => issue::list(&output, args)?,
        Commands::Show { id } => issue::show(&output, &id)?,
        Commands::SetStatus { id, status } => issue::set_status(&output, &id, status)?,
        Commands::Mode { id, mode } => issue::set_mode(&output, &id, mode)?,

        Commands::Next { parent } => {
            output.verbose_ctx("next", &format!("Parent filter: {:?}", parent));
            query::next(&output, parent.as_deref())?
        }
        Commands::Graph => query::graph(&output)?,
        Commands::Check => query::check(&output)?,

        Commands::Dep(cmd) => dep::run(cmd, &output)?,
    }

    debug!("command finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["strand", "next", "--format", "json", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn parses_status_case_insensitively() {
        let cli = Cli::try_parse_from(["strand", "set-status", "abc", "Complete"]).unwrap();
        match cli.command {
            Commands::SetStatus { status, .. } => assert_eq!(status, IssueStatus::Complete),
            _ => panic!("expected set-status"),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["strand", "mode", "abc", "sideways"]).is_err());
    }
}
