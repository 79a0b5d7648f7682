//! Text formatting functions for `workgraph`.
//!
//! Plain (non-ANSI) rendering for terminal output:
//! - Status icons (○ ◐ ● ✓ ✗)
//! - One-line record summaries
//! - Multi-line detail views

use std::fmt::Write as _;

use workgraph_core::{
    DependencyState, Detail, Event, Lifecycle, Project, ProjectDetail, Updated, WorkItem,
};

/// Status icon characters.
pub mod icons {
    /// Waiting to be picked up.
    pub const OPEN: &str = "○";
    /// Active work.
    pub const IN_PROGRESS: &str = "◐";
    /// Waiting on dependencies.
    pub const BLOCKED: &str = "●";
    /// Done, resolved or wontfix.
    pub const DONE: &str = "✓";
    /// Cancelled.
    pub const CANCELLED: &str = "✗";
}

/// Return the icon character for a status of any kind.
#[must_use]
pub fn format_status_icon<S: Lifecycle>(status: S) -> &'static str {
    if status == S::cancelled() {
        icons::CANCELLED
    } else if status.is_satisfying() {
        icons::DONE
    } else if status == S::blocked() {
        icons::BLOCKED
    } else if status == S::initial() || status == S::unblocked() {
        icons::OPEN
    } else {
        icons::IN_PROGRESS
    }
}

/// Format a single-line record summary.
///
/// Format: `{icon} {id} [{priority}] [{status}] {name}`
#[must_use]
pub fn format_item_line<R: WorkItem>(record: &R) -> String {
    let base = record.base();
    format!(
        "{} {} [{}] [{}] {}",
        format_status_icon(record.status()),
        base.id,
        base.priority,
        record.status(),
        base.name,
    )
}

#[must_use]
pub fn format_dependency(dependency: &DependencyState) -> String {
    let status = dependency.status.as_deref().unwrap_or("missing");
    let mark = if dependency.satisfied { icons::DONE } else { icons::BLOCKED };
    format!("{mark} {} ({status})", dependency.id)
}

#[must_use]
pub fn format_project_line(project: &Project) -> String {
    format!("{}  {}", project.id, project.name)
}

/// Format: `{timestamp} {type} {id} by {actor} ({changes})`
#[must_use]
pub fn format_event_line(event: &Event) -> String {
    let mut line = format!(
        "{} {:<8} {} by {}",
        event.ts.format("%Y-%m-%d %H:%M:%S"),
        event.event_type.as_str(),
        event.id,
        event.by
    );
    if let Some(changes) = event.changes.as_ref().filter(|changes| !changes.is_empty()) {
        let _ = write!(line, " ({})", changes.join(", "));
    }
    line
}

/// Full view of one record. `extra` lines come from the kind-specific
/// fields and are printed after the common ones.
#[must_use]
pub fn render_detail<R: WorkItem>(detail: &Detail<R>, extra: &[(&str, String)]) -> String {
    let base = detail.record.base();
    let mut out = format_item_line(&detail.record);
    let _ = write!(out, "\nProject: {}", base.project_id);
    let _ = write!(out, "\nGoal: {}", base.goal);
    if let Some(reason) = &base.reason {
        let _ = write!(out, "\nReason: {reason}");
    }
    for (label, value) in extra {
        if !value.is_empty() {
            let _ = write!(out, "\n{label}: {value}");
        }
    }
    let _ = write!(
        out,
        "\nCreated: {} by {}",
        base.created_at.format("%Y-%m-%d %H:%M"),
        base.created_by
    );
    let _ = write!(
        out,
        "\nUpdated: {} by {}",
        base.updated_at.format("%Y-%m-%d %H:%M"),
        base.updated_by
    );

    if !detail.dependencies.is_empty() {
        out.push_str("\n\nDepends on:");
        for dependency in &detail.dependencies {
            let _ = write!(out, "\n  {}", format_dependency(dependency));
        }
    }
    if !detail.dependents.is_empty() {
        out.push_str("\n\nDependents:");
        for dependent in &detail.dependents {
            let _ = write!(out, "\n  {dependent}");
        }
    }
    let _ = write!(out, "\n\n{} event(s)", detail.event_count);
    out
}

/// Summary of an update: what changed and what it unblocked.
#[must_use]
pub fn render_updated<R: WorkItem>(updated: &Updated<R>) -> String {
    let id = updated.record.id();
    if updated.changes.is_empty() {
        return format!("No changes to {id}");
    }
    let mut out = format!(
        "Updated {id} ({}): {}",
        updated.record.status(),
        updated.changes.join(", ")
    );
    if !updated.unblocked.is_empty() {
        let _ = write!(out, "\nUnblocked: {}", updated.unblocked.join(", "));
    }
    out
}

#[must_use]
pub fn render_project_detail(detail: &ProjectDetail) -> String {
    let project = &detail.project;
    let rules = &detail.schema.rules;
    let mut out = format_project_line(project);
    if let Some(description) = &project.description {
        let _ = write!(out, "\n{description}");
    }
    let _ = write!(
        out,
        "\nCreated: {} by {}",
        project.created_at.format("%Y-%m-%d %H:%M"),
        project.created_by
    );
    let _ = write!(
        out,
        "\nRecords: {} feature(s), {} task(s), {} issue(s)",
        detail.features, detail.tasks, detail.issues
    );
    let _ = write!(
        out,
        "\nDependency rules: feature={} task={} issue={}",
        rules.feature.dependency, rules.task.dependency, rules.issue.dependency
    );
    let levels: Vec<String> = rules.priority.levels.iter().map(ToString::to_string).collect();
    let _ = write!(
        out,
        "\nPriorities: {} (default {})",
        levels.join(" "),
        rules.priority.default
    );
    out
}
