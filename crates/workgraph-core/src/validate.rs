//! Validation of record fields and proposed dependency edges.
//!
//! Nothing here mutates storage. Field checks collect every problem before
//! failing; dependency checks stop at the first rejected edge.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, ValidationError, WorkflowError};
use crate::id;
use crate::index::ItemIndex;
use crate::lifecycle::{Lifecycle, WorkItem};
use crate::model::{DependencyRule, Feature, Issue, ItemBase, ProjectSchema, Task};
use crate::store::EntityStore;

/// Longest accepted record name.
pub const MAX_NAME_LEN: usize = 200;

/// Kind-specific field rules layered on top of the common ones.
pub trait FieldRules {
    /// Push any violations of this kind's own fields.
    fn check_fields(&self, creating: bool, errors: &mut Vec<ValidationError>);
}

impl FieldRules for Feature {
    fn check_fields(&self, _creating: bool, _errors: &mut Vec<ValidationError>) {}
}

impl FieldRules for Task {
    fn check_fields(&self, creating: bool, errors: &mut Vec<ValidationError>) {
        let lists = [
            ("implementation_steps", &self.implementation_steps),
            ("test_cases", &self.test_cases),
            ("derivable_files", &self.derivable_files),
            ("library_needs", &self.library_needs),
        ];
        for (field, values) in lists {
            if creating && values.is_empty() {
                errors.push(ValidationError::new(field, "at least one entry is required"));
            }
            check_blank_entries(field, values, errors);
        }
        if self.feature_id.trim().is_empty() {
            errors.push(ValidationError::new("feature_id", "cannot be empty"));
        }
    }
}

impl FieldRules for Issue {
    fn check_fields(&self, _creating: bool, errors: &mut Vec<ValidationError>) {
        check_blank_entries("affected_files", &self.affected_files, errors);
        check_blank_entries("affected_tests", &self.affected_tests, errors);
        check_blank_entries("implementation_steps", &self.implementation_steps, errors);
        check_blank_entries("library_needs", &self.library_needs, errors);
    }
}

fn check_blank_entries(field: &str, values: &[String], errors: &mut Vec<ValidationError>) {
    if values.iter().any(|value| value.trim().is_empty()) {
        errors.push(ValidationError::new(field, "entries cannot be blank"));
    }
}

/// Validates record fields.
pub struct ItemValidator;

impl ItemValidator {
    /// Validate the fields shared by every kind.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn validate_base(base: &ItemBase, schema: &ProjectSchema) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        Self::check_base(base, schema, &mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate a complete record, common and kind-specific fields.
    ///
    /// # Errors
    ///
    /// Returns a single or multiple validation error.
    pub fn validate<R: WorkItem + FieldRules>(
        record: &R,
        schema: &ProjectSchema,
        creating: bool,
    ) -> Result<()> {
        let mut errors = Vec::new();
        Self::check_base(record.base(), schema, &mut errors);
        record.check_fields(creating, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::from_validation_errors(errors))
        }
    }

    fn check_base(base: &ItemBase, schema: &ProjectSchema, errors: &mut Vec<ValidationError>) {
        if base.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "cannot be empty"));
        }
        if base.name.chars().count() > MAX_NAME_LEN {
            errors.push(ValidationError::new("name", "exceeds 200 characters"));
        }
        if base.goal.trim().is_empty() {
            errors.push(ValidationError::new("goal", "cannot be empty"));
        }
        if !schema.rules.priority.levels.contains(&base.priority) {
            let allowed: Vec<String> = schema
                .rules
                .priority
                .levels
                .iter()
                .map(ToString::to_string)
                .collect();
            errors.push(ValidationError::new(
                "priority",
                format!("{} is not allowed in this project (allowed: {})", base.priority, allowed.join(", ")),
            ));
        }
        check_blank_entries("depends_on", &base.depends_on, errors);
    }
}

/// Validates proposed dependency edges for one record.
pub struct DependencyValidator;

impl DependencyValidator {
    /// Check `proposed` as new dependencies of `self_id` (`None` on create)
    /// in `project_id`.
    ///
    /// In order: self-reference, then per edge the target's existence,
    /// status and the cross-project rule of the dependent's project, then a
    /// cycle search rooted at each edge.
    ///
    /// # Errors
    ///
    /// Returns the first rejection found.
    pub fn validate<S: EntityStore, R: WorkItem>(
        index: &mut ItemIndex<'_, S, R>,
        project_id: &str,
        self_id: Option<&str>,
        proposed: &[String],
    ) -> Result<()> {
        if proposed.is_empty() {
            return Ok(());
        }

        if let Some(self_id) = self_id {
            if proposed.iter().any(|dep| dep == self_id) {
                return Err(WorkflowError::SelfDependency {
                    kind: R::KIND.to_string(),
                    id: self_id.to_string(),
                });
            }
        }

        let mut cross_rule: Option<DependencyRule> = None;
        for dep in proposed {
            let target_project = id::parse_as(R::KIND, dep)?.project_id;
            let status = index
                .get(dep)?
                .map(WorkItem::status)
                .ok_or_else(|| WorkflowError::not_found(R::KIND, dep.as_str()))?;
            if status.rejects_as_dependency() {
                return Err(WorkflowError::UnusableDependency {
                    kind: R::KIND.to_string(),
                    id: dep.clone(),
                    status: status.to_string(),
                });
            }

            if target_project != project_id {
                let rule = if let Some(rule) = cross_rule {
                    rule
                } else {
                    let loaded = index.store().read_schema(project_id)?.dependency_rule(R::KIND);
                    cross_rule = Some(loaded);
                    loaded
                };
                if !rule.allows_cross_project() {
                    return Err(WorkflowError::DependencyRuleViolation {
                        kind: R::KIND.to_string(),
                        id: dep.clone(),
                        target_project,
                        rule: rule.to_string(),
                    });
                }
            }
        }

        if let Some(self_id) = self_id {
            for dep in proposed {
                if let Some(path) = find_cycle(index, self_id, dep)? {
                    return Err(WorkflowError::CircularDependency { path });
                }
            }
        }
        Ok(())
    }
}

/// Depth-first search from `root` over `depends_on` edges looking for
/// `self_id`. Returns the closed path `self -> root -> ... -> self`.
///
/// The visited set is local to one root. IDs that cannot be resolved are
/// treated as leaves.
fn find_cycle<S: EntityStore, R: WorkItem>(
    index: &mut ItemIndex<'_, S, R>,
    self_id: &str,
    root: &str,
) -> Result<Option<Vec<String>>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut parents: HashMap<String, String> = HashMap::new();
    let mut stack = vec![root.to_string()];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        let Some(deps) = index.find(&node)?.map(|record| record.depends_on().to_vec()) else {
            debug!(kind = %R::KIND, id = %node, "Skipping unresolved node in cycle search");
            continue;
        };

        for dep in deps {
            if dep == self_id {
                let mut chain = vec![node.clone()];
                let mut cursor = &node;
                while let Some(parent) = parents.get(cursor) {
                    chain.push(parent.clone());
                    cursor = parent;
                }
                chain.reverse();

                let mut path = Vec::with_capacity(chain.len() + 2);
                path.push(self_id.to_string());
                path.extend(chain);
                path.push(self_id.to_string());
                return Ok(Some(path));
            }
            if !visited.contains(&dep) {
                parents.entry(dep.clone()).or_insert_with(|| node.clone());
                stack.push(dep);
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Priority, TaskStatus};
    use crate::store::FsStore;

    fn task(project: &str, suffix: &str, deps: &[&str], status: TaskStatus) -> Task {
        let feature = id::feature_id(project, "f1");
        let mut base = ItemBase::new(project, suffix, "goal", "tester");
        base.id = id::task_id(&feature, suffix);
        base.depends_on = deps.iter().map(ToString::to_string).collect();
        Task {
            base,
            feature_id: feature,
            status,
            implementation_steps: vec!["s".into()],
            test_cases: vec!["t".into()],
            derivable_files: vec!["f".into()],
            library_needs: vec!["l".into()],
        }
    }

    fn tid(project: &str, suffix: &str) -> String {
        id::task_id(&id::feature_id(project, "f1"), suffix)
    }

    fn seed(store: &FsStore, records: &[Task]) {
        for record in records {
            store.write_new(record).unwrap();
        }
    }

    #[test]
    fn base_validation_collects_all_errors() {
        let mut base = ItemBase::new("acme", " ", "", "tester");
        base.priority = Priority::P5;
        let mut schema = ProjectSchema::default();
        schema.rules.priority.levels = vec![Priority::P0, Priority::P1];

        let errors = ItemValidator::validate_base(&base, &schema).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "goal", "priority"]);
    }

    #[test]
    fn task_lists_required_only_on_create() {
        let mut record = task("acme", "a", &[], TaskStatus::Ready);
        record.test_cases.clear();
        let schema = ProjectSchema::default();

        let err = ItemValidator::validate(&record, &schema, true).unwrap_err();
        assert!(err.to_string().contains("test_cases"));
        assert!(ItemValidator::validate(&record, &schema, false).is_ok());
    }

    #[test]
    fn rejects_self_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let a = tid("acme", "a");
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        let err = DependencyValidator::validate(&mut index, "acme", Some(&a), &[a.clone()]).unwrap_err();
        assert!(matches!(err, WorkflowError::SelfDependency { .. }));
    }

    #[test]
    fn rejects_missing_and_malformed_targets() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);

        let err = DependencyValidator::validate(&mut index, "acme", None, &[tid("acme", "zz")]).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        let err = DependencyValidator::validate(&mut index, "acme", None, &["garbage".to_string()]).unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedId { .. }));
    }

    #[test]
    fn rejects_done_and_cancelled_targets() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        seed(
            &store,
            &[
                task("acme", "d", &[], TaskStatus::Done),
                task("acme", "c", &[], TaskStatus::Cancelled),
            ],
        );
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        for suffix in ["d", "c"] {
            let err = DependencyValidator::validate(&mut index, "acme", None, &[tid("acme", suffix)]).unwrap_err();
            assert!(matches!(err, WorkflowError::UnusableDependency { .. }));
        }
    }

    #[test]
    fn cross_project_follows_dependent_project_rule() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        seed(&store, &[task("api", "x", &[], TaskStatus::Ready)]);

        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        let err = DependencyValidator::validate(&mut index, "web", None, &[tid("api", "x")]).unwrap_err();
        assert!(matches!(err, WorkflowError::DependencyRuleViolation { .. }));

        let mut schema = ProjectSchema::default();
        schema.set_dependency_rule(EntityKind::Task, DependencyRule::Disabled);
        store.write_schema("web", &schema).unwrap();
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        assert!(DependencyValidator::validate(&mut index, "web", None, &[tid("api", "x")]).is_err());

        schema.set_dependency_rule(EntityKind::Task, DependencyRule::CrossProjectAllowed);
        store.write_schema("web", &schema).unwrap();
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        DependencyValidator::validate(&mut index, "web", None, &[tid("api", "x")]).unwrap();
    }

    #[test]
    fn detects_cycle_with_full_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let a = tid("acme", "a");
        let b = tid("acme", "b");
        let c = tid("acme", "c");
        seed(
            &store,
            &[
                task("acme", "a", &[], TaskStatus::Ready),
                task("acme", "b", &[a.as_str()], TaskStatus::Blocked),
                task("acme", "c", &[b.as_str()], TaskStatus::Blocked),
            ],
        );

        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        let err = DependencyValidator::validate(&mut index, "acme", Some(&a), &[c.clone()]).unwrap_err();
        match err {
            WorkflowError::CircularDependency { path } => {
                assert_eq!(path, vec![a.clone(), c, b, a]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shared_subdependency_is_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let base = tid("acme", "base");
        seed(
            &store,
            &[
                task("acme", "base", &[], TaskStatus::Ready),
                task("acme", "l", &[base.as_str()], TaskStatus::Blocked),
                task("acme", "r", &[base.as_str()], TaskStatus::Blocked),
                task("acme", "top", &[], TaskStatus::Ready),
            ],
        );
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        DependencyValidator::validate(
            &mut index,
            "acme",
            Some(&tid("acme", "top")),
            &[tid("acme", "l"), tid("acme", "r")],
        )
        .unwrap();
    }

    #[test]
    fn dangling_edges_do_not_break_cycle_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let ghost = tid("acme", "ghost");
        seed(
            &store,
            &[
                task("acme", "a", &[ghost.as_str(), "junk"], TaskStatus::Blocked),
                task("acme", "b", &[], TaskStatus::Ready),
            ],
        );
        let mut index: ItemIndex<'_, _, Task> = ItemIndex::new(&store);
        DependencyValidator::validate(&mut index, "acme", Some(&tid("acme", "b")), &[tid("acme", "a")]).unwrap();
    }
}
