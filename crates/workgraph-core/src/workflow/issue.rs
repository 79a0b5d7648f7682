use super::{Workflow, set_field};
use crate::error::Result;
use crate::model::{Issue, IssueStatus, ItemBase};
use crate::query::{CreateIssue, Detail, ListFilter, UpdateIssue, Updated};
use crate::store::EntityStore;

impl<S: EntityStore> Workflow<S> {
    /// Create an issue in an existing project.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields or dependencies,
    /// `ProjectNotFound`, or a storage error.
    pub fn create_issue(&self, input: CreateIssue) -> Result<Issue> {
        let mut base = ItemBase::new(&input.project_id, input.name, input.goal, &input.actor);
        base.depends_on = input.depends_on;
        let record = Issue {
            base,
            status: IssueStatus::Open,
            issue_type: input.issue_type,
            affected_files: input.affected_files,
            affected_tests: input.affected_tests,
            implementation_steps: input.implementation_steps,
            library_needs: input.library_needs,
        };
        self.create_item(record, &input.project_id, input.priority)
    }

    /// Update an issue's fields and/or status. Supports every named action.
    ///
    /// # Errors
    ///
    /// Returns a validation error (illegal transition, locked record, bad
    /// dependency, ...), `NotFound`, or a storage error.
    pub fn update_issue(&self, input: UpdateIssue) -> Result<Updated<Issue>> {
        let UpdateIssue {
            id,
            changes,
            status,
            action,
            issue_type,
            affected_files,
            affected_tests,
            implementation_steps,
            library_needs,
        } = input;
        self.update_item(&id, &changes, status, action, |record: &mut Issue, changed| {
            set_field(&mut record.issue_type, issue_type, "issue_type", changed);
            set_field(&mut record.affected_files, affected_files, "affected_files", changed);
            set_field(&mut record.affected_tests, affected_tests, "affected_tests", changed);
            set_field(&mut record.implementation_steps, implementation_steps, "implementation_steps", changed);
            set_field(&mut record.library_needs, library_needs, "library_needs", changed);
        })
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` or a storage error.
    pub fn list_issues(&self, filter: &ListFilter<IssueStatus>) -> Result<Vec<Issue>> {
        self.list_items(filter, |issue: &Issue| {
            filter
                .issue_type
                .is_none_or(|issue_type| issue.issue_type == issue_type)
        })
    }

    /// # Errors
    ///
    /// Returns `MalformedId`, `NotFound` or a storage error.
    pub fn issue(&self, id: &str) -> Result<Detail<Issue>> {
        self.detail_item(id)
    }
}
