use super::{Workflow, set_field};
use crate::error::Result;
use crate::model::{Feature, FeatureStatus, ItemBase};
use crate::query::{CreateFeature, Detail, ListFilter, UpdateFeature, Updated};
use crate::store::EntityStore;

impl<S: EntityStore> Workflow<S> {
    /// Create a feature in an existing project.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields or dependencies,
    /// `ProjectNotFound`, or a storage error.
    pub fn create_feature(&self, input: CreateFeature) -> Result<Feature> {
        let mut base = ItemBase::new(&input.project_id, input.name, input.goal, &input.actor);
        base.depends_on = input.depends_on;
        let record = Feature {
            base,
            status: FeatureStatus::Draft,
            scope: input.scope,
        };
        self.create_item(record, &input.project_id, input.priority)
    }

    /// Update a feature's fields and/or status.
    ///
    /// # Errors
    ///
    /// Returns a validation error (illegal transition, locked record, bad
    /// dependency, ...), `NotFound`, or a storage error.
    pub fn update_feature(&self, input: UpdateFeature) -> Result<Updated<Feature>> {
        let UpdateFeature {
            id,
            changes,
            status,
            action,
            scope,
        } = input;
        self.update_item(&id, &changes, status, action, |record: &mut Feature, changed| {
            set_field(&mut record.scope, scope, "scope", changed);
        })
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` or a storage error.
    pub fn list_features(&self, filter: &ListFilter<FeatureStatus>) -> Result<Vec<Feature>> {
        self.list_items(filter, |_: &Feature| true)
    }

    /// # Errors
    ///
    /// Returns `MalformedId`, `NotFound` or a storage error.
    pub fn feature(&self, id: &str) -> Result<Detail<Feature>> {
        self.detail_item(id)
    }
}
