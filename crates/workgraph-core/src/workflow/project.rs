use chrono::Utc;
use tracing::info;

use super::{Workflow, note};
use crate::error::{Result, WorkflowError};
use crate::id;
use crate::lifecycle::WorkItem;
use crate::model::{
    DependencyRule, EntityKind, Event, EventType, Feature, Issue, Project, ProjectSchema, Task,
};
use crate::query::{CreateProject, ProjectDetail};
use crate::store::EntityStore;

const PROJECT_LAYER: &str = "project";

impl<S: EntityStore> Workflow<S> {
    /// Create a project with the given (or default) schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad ID or name, `ProjectExists`,
    /// `PermissionDenied`, or a storage error.
    pub fn create_project(&self, input: CreateProject) -> Result<Project> {
        id::validate_project_id(&input.id)?;
        if input.name.trim().is_empty() {
            return Err(WorkflowError::validation("name", "cannot be empty"));
        }
        let schema = input.schema.unwrap_or_default();
        if !schema.rules.priority.levels.contains(&schema.rules.priority.default) {
            return Err(WorkflowError::validation(
                "priority",
                format!("default {} is not one of the allowed levels", schema.rules.priority.default),
            ));
        }
        if self.store.project_exists(&input.id)? {
            return Err(WorkflowError::ProjectExists { id: input.id });
        }

        self.store.check_writable(&input.id)?;
        let project = Project {
            id: input.id,
            name: input.name,
            description: input.description.filter(|text| !text.trim().is_empty()),
            created_at: Utc::now(),
            created_by: input.actor,
        };
        self.store.write_schema(&project.id, &schema)?;
        self.store.write_project(&project)?;
        self.store.append_event(
            &project.id,
            &Event::new(PROJECT_LAYER, EventType::Created, &project.id, &project.created_by),
        )?;

        info!(project = %project.id, "Created project");
        Ok(project)
    }

    /// Every project, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a project file cannot be read.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.store
            .project_ids()?
            .iter()
            .map(|project_id| self.store.read_project(project_id))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` or a storage error.
    pub fn project(&self, project_id: &str) -> Result<ProjectDetail> {
        let project = self.store.read_project(project_id)?;
        let schema = self.store.read_schema(project_id)?;
        Ok(ProjectDetail {
            project,
            schema,
            features: self.store.read_all::<Feature>(project_id)?.len(),
            tasks: self.store.read_all::<Task>(project_id)?.len(),
            issues: self.store.read_all::<Issue>(project_id)?.len(),
        })
    }

    /// Change the cross-project dependency rule for one kind.
    ///
    /// Only edges added afterwards are checked against the new rule.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound`, `PermissionDenied`, or a storage error.
    pub fn set_dependency_rule(
        &self,
        project_id: &str,
        kind: EntityKind,
        rule: DependencyRule,
        actor: &str,
    ) -> Result<ProjectSchema> {
        self.store.read_project(project_id)?;
        let mut schema = self.store.read_schema(project_id)?;
        if schema.dependency_rule(kind) == rule {
            return Ok(schema);
        }

        self.store.check_writable(project_id)?;
        schema.set_dependency_rule(kind, rule);
        self.store.write_schema(project_id, &schema)?;

        let mut changes = Vec::new();
        note(&mut changes, &format!("rules.{kind}.dependency"));
        self.store.append_event(
            project_id,
            &Event::new(PROJECT_LAYER, EventType::Updated, project_id, actor).with_changes(changes),
        )?;
        info!(project = project_id, %kind, %rule, "Changed dependency rule");
        Ok(schema)
    }

    /// Remove a project and everything in it.
    ///
    /// Refuses while records in other projects still depend on records in
    /// this one, unless `force` is set.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound`, `HasDependents`, `PermissionDenied`, or a
    /// storage error.
    pub fn delete_project(&self, project_id: &str, force: bool) -> Result<()> {
        self.store.read_project(project_id)?;
        if !force {
            let mut external = self.external_dependents::<Feature>(project_id)?;
            external.extend(self.external_dependents::<Task>(project_id)?);
            external.extend(self.external_dependents::<Issue>(project_id)?);
            if !external.is_empty() {
                return Err(WorkflowError::HasDependents {
                    id: project_id.to_string(),
                    count: external.len(),
                    dependents: external,
                });
            }
        }

        self.store.delete_project(project_id)?;
        info!(project = project_id, force, "Deleted project");
        Ok(())
    }

    /// Records outside `project_id` with an edge into it.
    fn external_dependents<R: WorkItem>(&self, project_id: &str) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for other in self.store.project_ids()? {
            if other == project_id {
                continue;
            }
            for record in self.store.read_all::<R>(&other)? {
                let points_inside = record
                    .depends_on()
                    .iter()
                    .any(|dep| id::project_of(dep).is_ok_and(|owner| owner == project_id));
                if points_inside {
                    found.push(record.id().to_string());
                }
            }
        }
        Ok(found)
    }
}
