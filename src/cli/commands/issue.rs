use anyhow::Result;
use workgraph_core::{CreateIssue, ListFilter, UpdateIssue};

use super::{print_created, print_records};
use crate::cli::{Context, IssueSubcommand};
use crate::format::{render_detail, render_updated};

/// Execute an `issue` subcommand.
///
/// # Errors
///
/// Returns an error if the engine rejects the request or storage fails.
pub fn execute(command: IssueSubcommand, ctx: &Context) -> Result<()> {
    match command {
        IssueSubcommand::Create(args) => {
            let issue = ctx.workflow.create_issue(CreateIssue {
                project_id: args.project,
                name: args.name,
                goal: args.goal,
                priority: args.priority,
                depends_on: args.depends_on,
                issue_type: args.issue_type,
                affected_files: args.affected_files,
                affected_tests: args.affected_tests,
                implementation_steps: args.steps,
                library_needs: args.libraries,
                actor: ctx.actor.clone(),
            })?;
            print_created(ctx.output, &issue)
        }
        IssueSubcommand::Update(args) => {
            let (changes, action) = args.changes.into_changes(&ctx.actor);
            let updated = ctx.workflow.update_issue(UpdateIssue {
                id: args.id,
                changes,
                status: args.status,
                action,
                issue_type: args.issue_type,
                affected_files: args.affected_files,
                affected_tests: args.affected_tests,
                implementation_steps: args.steps,
                library_needs: args.libraries,
            })?;
            ctx.output.emit(&updated, || render_updated(&updated))
        }
        IssueSubcommand::List(args) => {
            let filter = ListFilter {
                statuses: args.status,
                priorities: args.common.priority,
                issue_type: args.issue_type,
                limit: args.common.limit,
                ..ListFilter::project(args.project)
            };
            let issues = ctx.workflow.list_issues(&filter)?;
            print_records(ctx.output, issues, "issue")
        }
        IssueSubcommand::Show { id } => {
            let detail = ctx.workflow.issue(&id)?;
            let issue = &detail.record;
            ctx.output.emit(&detail, || {
                render_detail(
                    &detail,
                    &[
                        ("Type", issue.issue_type.to_string()),
                        ("Affected files", issue.affected_files.join(", ")),
                        ("Affected tests", issue.affected_tests.join(", ")),
                        ("Steps", issue.implementation_steps.join("; ")),
                        ("Libraries", issue.library_needs.join(", ")),
                    ],
                )
            })
        }
    }
}
