//! Typed inputs and outputs of the workflow facade.

use serde::Serialize;

use crate::lifecycle::Action;
use crate::model::{
    FeatureStatus, IssueStatus, IssueType, Priority, ProjectSchema, Scope, TaskStatus,
};

// ============================================================================
// Create inputs
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CreateFeature {
    pub project_id: String,
    pub name: String,
    pub goal: String,
    /// Falls back to the project schema's default.
    pub priority: Option<Priority>,
    pub depends_on: Vec<String>,
    pub scope: Scope,
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    /// Parent feature; the owning project is parsed from it.
    pub feature_id: String,
    pub name: String,
    pub goal: String,
    pub priority: Option<Priority>,
    pub depends_on: Vec<String>,
    pub implementation_steps: Vec<String>,
    pub test_cases: Vec<String>,
    pub derivable_files: Vec<String>,
    pub library_needs: Vec<String>,
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateIssue {
    pub project_id: String,
    pub name: String,
    pub goal: String,
    pub priority: Option<Priority>,
    pub depends_on: Vec<String>,
    pub issue_type: IssueType,
    pub affected_files: Vec<String>,
    pub affected_tests: Vec<String>,
    pub implementation_steps: Vec<String>,
    pub library_needs: Vec<String>,
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Initial schema; the default schema when `None`.
    pub schema: Option<ProjectSchema>,
    pub actor: String,
}

// ============================================================================
// Update inputs
// ============================================================================

/// Field changes shared by every kind. `None` / empty means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub priority: Option<Priority>,
    /// Replace the whole dependency list. Applied before add/remove.
    pub depends_on: Option<Vec<String>>,
    pub add_dependencies: Vec<String>,
    pub remove_dependencies: Vec<String>,
    /// Required by cancel and wontfix; rejected otherwise.
    pub reason: Option<String>,
    /// Cancel even when active dependents exist.
    pub force: bool,
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFeature {
    pub id: String,
    pub changes: ItemChanges,
    pub status: Option<FeatureStatus>,
    pub action: Option<Action>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub id: String,
    pub changes: ItemChanges,
    pub status: Option<TaskStatus>,
    pub action: Option<Action>,
    pub implementation_steps: Option<Vec<String>>,
    pub test_cases: Option<Vec<String>>,
    pub derivable_files: Option<Vec<String>>,
    pub library_needs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIssue {
    pub id: String,
    pub changes: ItemChanges,
    pub status: Option<IssueStatus>,
    pub action: Option<Action>,
    pub issue_type: Option<IssueType>,
    pub affected_files: Option<Vec<String>>,
    pub affected_tests: Option<Vec<String>>,
    pub implementation_steps: Option<Vec<String>>,
    pub library_needs: Option<Vec<String>>,
}

// ============================================================================
// List filters
// ============================================================================

/// Filter for listing one kind within a project. Empty vectors match all.
#[derive(Debug, Clone)]
pub struct ListFilter<S> {
    pub project_id: String,
    pub statuses: Vec<S>,
    pub priorities: Vec<Priority>,
    /// Tasks only: restrict to one parent feature.
    pub feature_id: Option<String>,
    /// Issues only.
    pub issue_type: Option<IssueType>,
    pub limit: Option<usize>,
}

impl<S> ListFilter<S> {
    #[must_use]
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            statuses: Vec::new(),
            priorities: Vec::new(),
            feature_id: None,
            issue_type: None,
            limit: None,
        }
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Result of an update.
#[derive(Debug, Clone, Serialize)]
pub struct Updated<R> {
    pub record: R,
    /// Names of the fields that changed, in a stable order.
    pub changes: Vec<String>,
    /// Dependents flipped out of `blocked` by this update.
    pub unblocked: Vec<String>,
}

/// One dependency as seen from its dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyState {
    pub id: String,
    /// `None` if the dependency no longer resolves.
    pub status: Option<String>,
    pub satisfied: bool,
}

/// A record plus its graph neighbourhood.
#[derive(Debug, Clone, Serialize)]
pub struct Detail<R> {
    pub record: R,
    pub event_count: usize,
    pub dependencies: Vec<DependencyState>,
    /// IDs of same-kind records (any project) that depend on this one.
    pub dependents: Vec<String>,
}

/// A project with its schema and record counts.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: crate::model::Project,
    pub schema: ProjectSchema,
    pub features: usize,
    pub tasks: usize,
    pub issues: usize,
}
