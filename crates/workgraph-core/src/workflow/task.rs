use super::{Workflow, set_field};
use crate::error::{Result, WorkflowError};
use crate::id;
use crate::model::{EntityKind, Feature, ItemBase, Task, TaskStatus};
use crate::query::{CreateTask, Detail, ListFilter, UpdateTask, Updated};
use crate::store::EntityStore;

impl<S: EntityStore> Workflow<S> {
    /// Create a task under an existing feature.
    ///
    /// # Errors
    ///
    /// Returns `MalformedId` if `feature_id` is not a feature ID, `NotFound`
    /// if the feature does not exist, a validation error for bad fields or
    /// dependencies, or a storage error.
    pub fn create_task(&self, input: CreateTask) -> Result<Task> {
        let project_id = id::parse_as(EntityKind::Feature, &input.feature_id)?.project_id;
        self.store.read_project(&project_id)?;
        self.store.read_one::<Feature>(&project_id, &input.feature_id)?;

        let mut base = ItemBase::new(&project_id, input.name, input.goal, &input.actor);
        base.depends_on = input.depends_on;
        let record = Task {
            base,
            feature_id: input.feature_id.clone(),
            status: TaskStatus::Ready,
            implementation_steps: input.implementation_steps,
            test_cases: input.test_cases,
            derivable_files: input.derivable_files,
            library_needs: input.library_needs,
        };
        self.create_item(record, &input.feature_id, input.priority)
    }

    /// Update a task's fields and/or status.
    ///
    /// # Errors
    ///
    /// Returns a validation error (illegal transition, locked record, bad
    /// dependency, ...), `NotFound`, or a storage error.
    pub fn update_task(&self, input: UpdateTask) -> Result<Updated<Task>> {
        let UpdateTask {
            id,
            changes,
            status,
            action,
            implementation_steps,
            test_cases,
            derivable_files,
            library_needs,
        } = input;

        for (field, values) in [
            ("implementation_steps", &implementation_steps),
            ("test_cases", &test_cases),
            ("derivable_files", &derivable_files),
            ("library_needs", &library_needs),
        ] {
            if values.as_ref().is_some_and(Vec::is_empty) {
                return Err(WorkflowError::validation(field, "cannot be emptied"));
            }
        }

        self.update_item(&id, &changes, status, action, |record: &mut Task, changed| {
            set_field(&mut record.implementation_steps, implementation_steps, "implementation_steps", changed);
            set_field(&mut record.test_cases, test_cases, "test_cases", changed);
            set_field(&mut record.derivable_files, derivable_files, "derivable_files", changed);
            set_field(&mut record.library_needs, library_needs, "library_needs", changed);
        })
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` or a storage error.
    pub fn list_tasks(&self, filter: &ListFilter<TaskStatus>) -> Result<Vec<Task>> {
        self.list_items(filter, |task: &Task| {
            filter
                .feature_id
                .as_ref()
                .is_none_or(|feature_id| task.feature_id == *feature_id)
        })
    }

    /// # Errors
    ///
    /// Returns `MalformedId`, `NotFound` or a storage error.
    pub fn task(&self, id: &str) -> Result<Detail<Task>> {
        self.detail_item(id)
    }
}
