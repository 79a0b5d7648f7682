use anyhow::Result;
use workgraph_core::{CreateTask, ListFilter, UpdateTask, WorkflowError, id};

use super::{print_created, print_records};
use crate::cli::{Context, TaskListArgs, TaskSubcommand};
use crate::format::{render_detail, render_updated};

/// Execute a `task` subcommand.
///
/// # Errors
///
/// Returns an error if the engine rejects the request or storage fails.
pub fn execute(command: TaskSubcommand, ctx: &Context) -> Result<()> {
    match command {
        TaskSubcommand::Create(args) => {
            let task = ctx.workflow.create_task(CreateTask {
                feature_id: args.feature,
                name: args.name,
                goal: args.goal,
                priority: args.priority,
                depends_on: args.depends_on,
                implementation_steps: args.steps,
                test_cases: args.test_cases,
                derivable_files: args.files,
                library_needs: args.libraries,
                actor: ctx.actor.clone(),
            })?;
            print_created(ctx.output, &task)
        }
        TaskSubcommand::Update(args) => {
            let (changes, action) = args.changes.into_changes(&ctx.actor);
            let updated = ctx.workflow.update_task(UpdateTask {
                id: args.id,
                changes,
                status: args.status,
                action,
                implementation_steps: args.steps,
                test_cases: args.test_cases,
                derivable_files: args.files,
                library_needs: args.libraries,
            })?;
            ctx.output.emit(&updated, || render_updated(&updated))
        }
        TaskSubcommand::List(args) => list(args, ctx),
        TaskSubcommand::Show { id } => {
            let detail = ctx.workflow.task(&id)?;
            let task = &detail.record;
            ctx.output.emit(&detail, || {
                render_detail(
                    &detail,
                    &[
                        ("Feature", task.feature_id.clone()),
                        ("Steps", task.implementation_steps.join("; ")),
                        ("Test cases", task.test_cases.join("; ")),
                        ("Files", task.derivable_files.join(", ")),
                        ("Libraries", task.library_needs.join(", ")),
                    ],
                )
            })
        }
    }
}

fn list(args: TaskListArgs, ctx: &Context) -> Result<()> {
    let project_id = match (args.project, &args.feature) {
        (Some(project), _) => project,
        (None, Some(feature)) => id::project_of(feature)?,
        (None, None) => {
            return Err(WorkflowError::validation(
                "project",
                "either --project or --feature is required",
            )
            .into());
        }
    };
    let filter = ListFilter {
        statuses: args.status,
        priorities: args.common.priority,
        feature_id: args.feature,
        limit: args.common.limit,
        ..ListFilter::project(project_id)
    };
    let tasks = ctx.workflow.list_tasks(&filter)?;
    print_records(ctx.output, tasks, "task")
}
