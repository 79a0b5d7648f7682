//! Command-line interface for `workgraph`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use workgraph_core::{
    Action, DependencyRule, EntityKind, FeatureStatus, FsStore, IssueStatus, IssueType,
    ItemChanges, Priority, Scope, TaskStatus, Workflow, WorkflowError,
};

use crate::config::{self, Config};
use crate::format::{ErrorReport, Output};

/// `workgraph` (wg) - dependency-aware work tracker.
#[derive(Parser, Debug)]
#[command(name = "wg")]
#[command(
    author,
    version,
    about = "Dependency-aware work tracker for projects, features, tasks and issues (JSONL)",
    long_about = None,
    after_help = "Exit codes: 0 ok, 1 system error, 2 validation error, 3 permission error."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Workspace directory (defaults to the nearest .workgraph)
    #[arg(long, global = true, env = "WG_DIR")]
    pub dir: Option<PathBuf>,

    /// Actor recorded on mutations
    #[arg(long, global = true, env = "WG_ACTOR")]
    pub actor: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a workgraph workspace
    Init,

    /// Manage projects
    Project(ProjectCommand),

    /// Manage features
    Feature(FeatureCommand),

    /// Manage tasks
    Task(TaskCommand),

    /// Manage issues
    Issue(IssueCommand),
}

// ============================================================================
// Shared argument groups
// ============================================================================

/// Field edits shared by every `update` subcommand.
#[derive(Args, Debug, Default)]
pub struct ChangeArgs {
    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New goal
    #[arg(long)]
    pub goal: Option<String>,

    /// New priority (P0-P5)
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Replace the whole dependency list (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "clear_deps")]
    pub depends_on: Option<Vec<String>>,

    /// Remove every dependency
    #[arg(long)]
    pub clear_deps: bool,

    /// Add dependencies (repeatable or comma-separated)
    #[arg(long = "add-dep", value_delimiter = ',')]
    pub add_deps: Vec<String>,

    /// Remove dependencies (repeatable or comma-separated)
    #[arg(long = "remove-dep", value_delimiter = ',')]
    pub remove_deps: Vec<String>,

    /// Named action: cancel, reopen, start, resolve, wontfix
    #[arg(long, conflicts_with = "status")]
    pub action: Option<Action>,

    /// Reason (required for cancel and wontfix)
    #[arg(long)]
    pub reason: Option<String>,

    /// Cancel even if active dependents exist
    #[arg(long)]
    pub force: bool,
}

impl ChangeArgs {
    fn into_changes(self, actor: &str) -> (ItemChanges, Option<Action>) {
        let depends_on = if self.clear_deps {
            Some(Vec::new())
        } else {
            self.depends_on
        };
        let changes = ItemChanges {
            name: self.name,
            goal: self.goal,
            priority: self.priority,
            depends_on,
            add_dependencies: self.add_deps,
            remove_dependencies: self.remove_deps,
            reason: self.reason,
            force: self.force,
            actor: actor.to_string(),
        };
        (changes, self.action)
    }
}

/// Filters shared by every `list` subcommand.
#[derive(Args, Debug, Default)]
pub struct ListCommonArgs {
    /// Filter by priority (repeatable)
    #[arg(short, long)]
    pub priority: Vec<Priority>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

// ============================================================================
// project
// ============================================================================

#[derive(Args, Debug)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub command: ProjectSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectSubcommand {
    /// Create a project
    Create(ProjectCreateArgs),

    /// List projects
    List,

    /// Show a project with its schema and record counts
    Show {
        /// Project ID
        id: String,
    },

    /// Set the cross-project dependency rule for one kind
    Rule {
        /// Project ID
        id: String,
        /// Entity kind: feature, task, issue
        kind: EntityKind,
        /// same_project_only, cross_project_allowed or disabled
        rule: DependencyRule,
    },

    /// Show the project's audit events
    Events(ProjectEventsArgs),

    /// Delete a project and all of its records
    Delete {
        /// Project ID
        id: String,
        /// Delete even if other projects depend on it
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project ID (lowercase letters, digits, hyphens)
    pub id: String,

    /// Display name (defaults to the ID)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Default priority for new records
    #[arg(long)]
    pub default_priority: Option<Priority>,

    /// Let features depend on other projects' features
    #[arg(long)]
    pub cross_project_features: bool,

    /// Let tasks depend on other projects' tasks
    #[arg(long)]
    pub cross_project_tasks: bool,

    /// Let issues depend on other projects' issues
    #[arg(long)]
    pub cross_project_issues: bool,
}

#[derive(Args, Debug)]
pub struct ProjectEventsArgs {
    /// Project ID
    pub id: String,

    /// Only events about this record
    #[arg(long)]
    pub record: Option<String>,

    /// Show only the most recent N events
    #[arg(long)]
    pub limit: Option<usize>,
}

// ============================================================================
// feature
// ============================================================================

#[derive(Args, Debug)]
pub struct FeatureCommand {
    #[command(subcommand)]
    pub command: FeatureSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum FeatureSubcommand {
    /// Create a feature
    Create(FeatureCreateArgs),
    /// Update a feature
    Update(FeatureUpdateArgs),
    /// List features in a project
    List(FeatureListArgs),
    /// Show a feature
    Show {
        /// Feature ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct FeatureCreateArgs {
    /// Feature name
    pub name: String,

    /// Owning project
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub goal: String,

    /// Priority (P0-P5; defaults to the project's default)
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Dependencies (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub depends_on: Vec<String>,

    #[arg(long)]
    pub scope: Option<Scope>,
}

#[derive(Args, Debug)]
pub struct FeatureUpdateArgs {
    /// Feature ID
    pub id: String,

    /// New status
    #[arg(long)]
    pub status: Option<FeatureStatus>,

    #[arg(long)]
    pub scope: Option<Scope>,

    #[command(flatten)]
    pub changes: ChangeArgs,
}

#[derive(Args, Debug)]
pub struct FeatureListArgs {
    /// Project ID
    #[arg(long)]
    pub project: String,

    /// Filter by status (repeatable)
    #[arg(short, long)]
    pub status: Vec<FeatureStatus>,

    #[command(flatten)]
    pub common: ListCommonArgs,
}

// ============================================================================
// task
// ============================================================================

#[derive(Args, Debug)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskSubcommand {
    /// Create a task under a feature
    Create(TaskCreateArgs),
    /// Update a task
    Update(TaskUpdateArgs),
    /// List tasks in a project or feature
    List(TaskListArgs),
    /// Show a task
    Show {
        /// Task ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct TaskCreateArgs {
    /// Task name
    pub name: String,

    /// Parent feature ID
    #[arg(long)]
    pub feature: String,

    #[arg(long)]
    pub goal: String,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Dependencies (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub depends_on: Vec<String>,

    /// Implementation step (repeatable, at least one)
    #[arg(long = "step")]
    pub steps: Vec<String>,

    /// Test case (repeatable, at least one)
    #[arg(long = "test-case")]
    pub test_cases: Vec<String>,

    /// Derivable file (repeatable, at least one)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Library need (repeatable, at least one)
    #[arg(long = "library")]
    pub libraries: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskUpdateArgs {
    /// Task ID
    pub id: String,

    /// New status
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// Replace the implementation steps
    #[arg(long = "step")]
    pub steps: Option<Vec<String>>,

    /// Replace the test cases
    #[arg(long = "test-case")]
    pub test_cases: Option<Vec<String>>,

    /// Replace the derivable files
    #[arg(long = "file")]
    pub files: Option<Vec<String>>,

    /// Replace the library needs
    #[arg(long = "library")]
    pub libraries: Option<Vec<String>>,

    #[command(flatten)]
    pub changes: ChangeArgs,
}

#[derive(Args, Debug)]
pub struct TaskListArgs {
    /// Project ID (implied by --feature)
    #[arg(long)]
    pub project: Option<String>,

    /// Only tasks of this feature
    #[arg(long)]
    pub feature: Option<String>,

    /// Filter by status (repeatable)
    #[arg(short, long)]
    pub status: Vec<TaskStatus>,

    #[command(flatten)]
    pub common: ListCommonArgs,
}

// ============================================================================
// issue
// ============================================================================

#[derive(Args, Debug)]
pub struct IssueCommand {
    #[command(subcommand)]
    pub command: IssueSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum IssueSubcommand {
    /// Create an issue
    Create(IssueCreateArgs),
    /// Update an issue
    Update(IssueUpdateArgs),
    /// List issues in a project
    List(IssueListArgs),
    /// Show an issue
    Show {
        /// Issue ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueCreateArgs {
    /// Issue name
    pub name: String,

    /// Owning project
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub goal: String,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// bug, improvement, debt, security or performance
    #[arg(long = "type", default_value = "bug")]
    pub issue_type: IssueType,

    /// Dependencies (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub depends_on: Vec<String>,

    #[arg(long = "affected-file")]
    pub affected_files: Vec<String>,

    #[arg(long = "affected-test")]
    pub affected_tests: Vec<String>,

    #[arg(long = "step")]
    pub steps: Vec<String>,

    #[arg(long = "library")]
    pub libraries: Vec<String>,
}

#[derive(Args, Debug)]
pub struct IssueUpdateArgs {
    /// Issue ID
    pub id: String,

    /// New status
    #[arg(long)]
    pub status: Option<IssueStatus>,

    #[arg(long = "type")]
    pub issue_type: Option<IssueType>,

    #[arg(long = "affected-file")]
    pub affected_files: Option<Vec<String>>,

    #[arg(long = "affected-test")]
    pub affected_tests: Option<Vec<String>>,

    #[arg(long = "step")]
    pub steps: Option<Vec<String>>,

    #[arg(long = "library")]
    pub libraries: Option<Vec<String>>,

    #[command(flatten)]
    pub changes: ChangeArgs,
}

#[derive(Args, Debug)]
pub struct IssueListArgs {
    /// Project ID
    #[arg(long)]
    pub project: String,

    /// Filter by status (repeatable)
    #[arg(short, long)]
    pub status: Vec<IssueStatus>,

    #[arg(long = "type")]
    pub issue_type: Option<IssueType>,

    #[command(flatten)]
    pub common: ListCommonArgs,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Everything a command needs once the workspace is resolved.
pub struct Context {
    pub workflow: Workflow<FsStore>,
    pub actor: String,
    pub output: Output,
}

/// A failed run, with the output mode that was in effect when it failed.
#[derive(Debug)]
pub struct Failure {
    pub error: anyhow::Error,
    /// `--json` or the workspace config's `json` switch.
    pub json: bool,
}

impl Cli {
    /// Run the parsed command.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] if the workspace cannot be resolved or the
    /// command fails.
    pub fn run(self) -> std::result::Result<(), Failure> {
        let mut json = self.json;
        self.dispatch(&mut json)
            .map_err(|error| Failure { error, json })
    }

    fn dispatch(self, json: &mut bool) -> Result<()> {
        let Self {
            json: json_flag,
            quiet,
            dir,
            actor,
            command,
            ..
        } = self;

        match command {
            Commands::Init => {
                let workspace = config::resolve_workspace(dir.as_deref(), false)?;
                let output = Output {
                    json: json_flag,
                    quiet,
                };
                commands::init::execute(&workspace, output)
            }
            Commands::Project(cmd) => {
                let ctx = Context::load(dir.as_deref(), actor.as_deref(), quiet, json)?;
                commands::project::execute(cmd.command, &ctx)
            }
            Commands::Feature(cmd) => {
                let ctx = Context::load(dir.as_deref(), actor.as_deref(), quiet, json)?;
                commands::feature::execute(cmd.command, &ctx)
            }
            Commands::Task(cmd) => {
                let ctx = Context::load(dir.as_deref(), actor.as_deref(), quiet, json)?;
                commands::task::execute(cmd.command, &ctx)
            }
            Commands::Issue(cmd) => {
                let ctx = Context::load(dir.as_deref(), actor.as_deref(), quiet, json)?;
                commands::issue::execute(cmd.command, &ctx)
            }
        }
    }
}

impl Context {
    /// Resolve the workspace and its config. `json` holds the `--json` flag
    /// on entry and is widened by the config's `json` switch.
    fn load(
        dir: Option<&Path>,
        actor: Option<&str>,
        quiet: bool,
        json: &mut bool,
    ) -> Result<Self> {
        let workspace = config::resolve_workspace(dir, true)?;
        let config = Config::load(&workspace)?;
        *json = *json || config.json;
        let ctx = Self {
            workflow: Workflow::new(FsStore::new(&workspace)),
            actor: config.resolve_actor(actor),
            output: Output {
                json: *json,
                quiet,
            },
        };
        tracing::debug!(workspace = %workspace.display(), actor = %ctx.actor, "Resolved workspace");
        Ok(ctx)
    }
}

/// Print an error to stderr and return the process exit code for it.
///
/// Engine errors keep their own exit code; anything else is a system
/// error.
#[must_use]
pub fn report_error(err: &anyhow::Error, json: bool) -> i32 {
    let workflow_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<WorkflowError>());
    let report = workflow_err.map_or_else(
        || ErrorReport::system(format!("{err:#}")),
        ErrorReport::from_workflow,
    );

    if json {
        let envelope = serde_json::json!({ "error": report });
        eprintln!("{envelope}");
    } else {
        eprintln!("Error: {}", report.message);
    }
    report.exit_code
}
