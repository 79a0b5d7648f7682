//! `wg project` - project lifecycle and schema rules.

use anyhow::Result;
use serde_json::json;
use workgraph_core::{CreateProject, DependencyRule, EntityKind, EntityStore, Event, ProjectSchema};

use crate::cli::{Context, ProjectCreateArgs, ProjectEventsArgs, ProjectSubcommand};
use crate::format::{format_event_line, format_project_line, render_project_detail};

/// Execute a `project` subcommand.
///
/// # Errors
///
/// Returns an error if the engine rejects the request or storage fails.
pub fn execute(command: ProjectSubcommand, ctx: &Context) -> Result<()> {
    match command {
        ProjectSubcommand::Create(args) => create(args, ctx),
        ProjectSubcommand::List => {
            let projects = ctx.workflow.list_projects()?;
            ctx.output.emit(&projects, || {
                if projects.is_empty() {
                    return "No projects found.".to_string();
                }
                projects
                    .iter()
                    .map(format_project_line)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ProjectSubcommand::Show { id } => {
            let detail = ctx.workflow.project(&id)?;
            ctx.output.emit(&detail, || render_project_detail(&detail))
        }
        ProjectSubcommand::Rule { id, kind, rule } => {
            let schema = ctx
                .workflow
                .set_dependency_rule(&id, kind, rule, &ctx.actor)?;
            ctx.output.emit(&schema, || {
                format!("{id}: {kind} dependencies are now {}", schema.dependency_rule(kind))
            })
        }
        ProjectSubcommand::Events(args) => events(&args, ctx),
        ProjectSubcommand::Delete { id, force } => {
            ctx.workflow.delete_project(&id, force)?;
            ctx.output
                .emit(&json!({ "deleted": id }), || format!("Deleted project {id}"))
        }
    }
}

fn create(args: ProjectCreateArgs, ctx: &Context) -> Result<()> {
    let schema = build_schema(&args);
    let project = ctx.workflow.create_project(CreateProject {
        name: args.name.unwrap_or_else(|| args.id.clone()),
        id: args.id,
        description: args.description,
        schema: Some(schema),
        actor: ctx.actor.clone(),
    })?;
    ctx.output
        .emit(&project, || format!("Created project {}", format_project_line(&project)))
}

fn build_schema(args: &ProjectCreateArgs) -> ProjectSchema {
    let mut schema = ProjectSchema::default();
    for (kind, allowed) in [
        (EntityKind::Feature, args.cross_project_features),
        (EntityKind::Task, args.cross_project_tasks),
        (EntityKind::Issue, args.cross_project_issues),
    ] {
        if allowed {
            schema.set_dependency_rule(kind, DependencyRule::CrossProjectAllowed);
        }
    }
    if let Some(default) = args.default_priority {
        schema.rules.priority.default = default;
    }
    schema
}

fn events(args: &ProjectEventsArgs, ctx: &Context) -> Result<()> {
    // Surface ProjectNotFound rather than an empty log.
    ctx.workflow.store().read_project(&args.id)?;
    let mut events: Vec<Event> = ctx
        .workflow
        .store()
        .read_events(&args.id)?
        .into_iter()
        .filter(|event| args.record.as_ref().is_none_or(|record| &event.id == record))
        .collect();
    if let Some(limit) = args.limit {
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
    }

    ctx.output.emit(&events, || {
        if events.is_empty() {
            return "No events found.".to_string();
        }
        events
            .iter()
            .map(format_event_line)
            .collect::<Vec<_>>()
            .join("\n")
    })
}
