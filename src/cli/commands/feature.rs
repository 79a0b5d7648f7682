use anyhow::Result;
use workgraph_core::{CreateFeature, ListFilter, UpdateFeature};

use super::{print_created, print_records};
use crate::cli::{Context, FeatureSubcommand};
use crate::format::{render_detail, render_updated};

/// Execute a `feature` subcommand.
///
/// # Errors
///
/// Returns an error if the engine rejects the request or storage fails.
pub fn execute(command: FeatureSubcommand, ctx: &Context) -> Result<()> {
    match command {
        FeatureSubcommand::Create(args) => {
            let feature = ctx.workflow.create_feature(CreateFeature {
                project_id: args.project,
                name: args.name,
                goal: args.goal,
                priority: args.priority,
                depends_on: args.depends_on,
                scope: args.scope.unwrap_or_default(),
                actor: ctx.actor.clone(),
            })?;
            print_created(ctx.output, &feature)
        }
        FeatureSubcommand::Update(args) => {
            let (changes, action) = args.changes.into_changes(&ctx.actor);
            let updated = ctx.workflow.update_feature(UpdateFeature {
                id: args.id,
                changes,
                status: args.status,
                action,
                scope: args.scope,
            })?;
            ctx.output.emit(&updated, || render_updated(&updated))
        }
        FeatureSubcommand::List(args) => {
            let filter = ListFilter {
                statuses: args.status,
                priorities: args.common.priority,
                limit: args.common.limit,
                ..ListFilter::project(args.project)
            };
            let features = ctx.workflow.list_features(&filter)?;
            print_records(ctx.output, features, "feature")
        }
        FeatureSubcommand::Show { id } => {
            let detail = ctx.workflow.feature(&id)?;
            ctx.output.emit(&detail, || {
                render_detail(&detail, &[("Scope", detail.record.scope.to_string())])
            })
        }
    }
}
