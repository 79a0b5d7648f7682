//! Unblock propagation.
//!
//! When a record reaches a satisfying status, every blocked record of the
//! same kind that lists it is re-checked, first in the trigger's own
//! project and then in every other project. A match whose dependencies are
//! *all* satisfied flips to its kind's unblocked status and gets a
//! system-authored `ready` event. This is a full rescan per completion, so
//! diamond-shaped graphs resolve on whichever completion comes last.

use tracing::{info, warn};

use crate::error::Result;
use crate::index::ItemIndex;
use crate::lifecycle::{Lifecycle, WorkItem};
use crate::model::{Event, EventType, SYSTEM_ACTOR};
use crate::store::EntityStore;

/// Unblock dependents of `trigger`. Returns the IDs that were flipped.
///
/// Does nothing unless `trigger` is in a satisfying status. Each project is
/// probed for writability before its first flip; a storage error part-way
/// through leaves earlier flips persisted.
///
/// # Errors
///
/// Returns `PermissionDenied` if a project holding a flip is read-only, or
/// a storage error if a project cannot be scanned or a flip cannot be
/// written.
pub fn propagate<S: EntityStore, R: WorkItem>(
    index: &mut ItemIndex<'_, S, R>,
    trigger: &R,
) -> Result<Vec<String>> {
    if !trigger.status().is_satisfying() {
        return Ok(Vec::new());
    }
    let store = index.store();
    index.upsert(trigger.clone());

    let own = trigger.project_id().to_string();
    let mut projects = vec![own.clone()];
    projects.extend(store.project_ids()?.into_iter().filter(|project| *project != own));

    let mut unblocked = Vec::new();
    for project in &projects {
        let candidates: Vec<R> = index
            .project_records(project)?
            .into_iter()
            .filter(|record| {
                record.status() == R::Status::blocked()
                    && record.depends_on().iter().any(|dep| dep == trigger.id())
            })
            .cloned()
            .collect();

        let mut ready = Vec::new();
        for candidate in candidates {
            if all_satisfied(index, &candidate)? {
                ready.push(candidate);
            }
        }
        if ready.is_empty() {
            continue;
        }
        store.check_writable(project)?;

        for mut record in ready {
            record.set_status(R::Status::unblocked());
            record.base_mut().touch(SYSTEM_ACTOR);
            store.replace(&record)?;
            store.append_event(
                record.project_id(),
                &Event::new(R::KIND.as_str(), EventType::Ready, record.id(), SYSTEM_ACTOR),
            )?;
            info!(kind = %R::KIND, id = %record.id(), trigger = %trigger.id(), "Unblocked dependent");

            unblocked.push(record.id().to_string());
            index.upsert(record);
        }
    }
    Ok(unblocked)
}

/// Whether every dependency of `record` is in a satisfying status.
/// Unresolvable dependencies count as unsatisfied.
///
/// # Errors
///
/// Returns a storage error if a dependency's project cannot be read.
pub fn all_satisfied<S: EntityStore, R: WorkItem>(
    index: &mut ItemIndex<'_, S, R>,
    record: &R,
) -> Result<bool> {
    for dep in record.depends_on() {
        match index.find(dep)? {
            Some(found) if found.status().is_satisfying() => {}
            Some(_) => return Ok(false),
            None => {
                warn!(kind = %R::KIND, id = %record.id(), dependency = %dep, "Dependency not found");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id;
    use crate::model::{
        Feature, FeatureStatus, Issue, IssueStatus, IssueType, ItemBase, Scope,
    };
    use crate::store::FsStore;

    fn feature(project: &str, suffix: &str, deps: &[&str], status: FeatureStatus) -> Feature {
        let mut base = ItemBase::new(project, suffix, "goal", "tester");
        base.id = id::feature_id(project, suffix);
        base.depends_on = deps.iter().map(ToString::to_string).collect();
        Feature {
            base,
            status,
            scope: Scope::Empty,
        }
    }

    fn issue(project: &str, suffix: &str, deps: &[&str], status: IssueStatus) -> Issue {
        let mut base = ItemBase::new(project, suffix, "goal", "tester");
        base.id = id::issue_id(project, suffix);
        base.depends_on = deps.iter().map(ToString::to_string).collect();
        Issue {
            base,
            status,
            issue_type: IssueType::Bug,
            affected_files: Vec::new(),
            affected_tests: Vec::new(),
            implementation_steps: Vec::new(),
            library_needs: Vec::new(),
        }
    }

    #[test]
    fn diamond_unblocks_only_when_both_done() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let left = id::feature_id("acme", "l");
        let right = id::feature_id("acme", "r");
        for record in [
            feature("acme", "l", &[], FeatureStatus::Active),
            feature("acme", "r", &[], FeatureStatus::Active),
            feature("acme", "top", &[left.as_str(), right.as_str()], FeatureStatus::Blocked),
        ] {
            store.write_new(&record).unwrap();
        }

        let done_left = feature("acme", "l", &[], FeatureStatus::Done);
        store.replace(&done_left).unwrap();
        let mut index = ItemIndex::new(&store);
        assert!(propagate(&mut index, &done_left).unwrap().is_empty());

        let done_right = feature("acme", "r", &[], FeatureStatus::Done);
        store.replace(&done_right).unwrap();
        let mut index = ItemIndex::new(&store);
        let flipped = propagate(&mut index, &done_right).unwrap();
        assert_eq!(flipped, vec![id::feature_id("acme", "top")]);

        let top: Feature = store.read_one("acme", &id::feature_id("acme", "top")).unwrap();
        assert_eq!(top.status, FeatureStatus::Draft);
        assert_eq!(top.base.updated_by, SYSTEM_ACTOR);
    }

    #[test]
    fn cascade_crosses_projects_and_logs_system_event() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        for project in ["api", "web"] {
            store
                .write_project(&crate::model::Project {
                    id: project.into(),
                    name: project.into(),
                    description: None,
                    created_at: chrono::Utc::now(),
                    created_by: "tester".into(),
                })
                .unwrap();
        }
        let upstream = id::issue_id("api", "u");
        store.write_new(&issue("api", "u", &[], IssueStatus::InProgress)).unwrap();
        store
            .write_new(&issue("web", "d", &[upstream.as_str()], IssueStatus::Blocked))
            .unwrap();

        let resolved = issue("api", "u", &[], IssueStatus::Resolved);
        store.replace(&resolved).unwrap();
        let mut index = ItemIndex::new(&store);
        let flipped = propagate(&mut index, &resolved).unwrap();
        assert_eq!(flipped, vec![id::issue_id("web", "d")]);

        let events = store.read_events("web").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Ready);
        assert_eq!(events[0].by, SYSTEM_ACTOR);
    }

    /// `FsStore` that reports one project as read-only.
    struct ReadOnlyProject {
        inner: FsStore,
        project: &'static str,
    }

    impl EntityStore for ReadOnlyProject {
        fn read_all<R: WorkItem>(&self, project_id: &str) -> Result<Vec<R>> {
            self.inner.read_all(project_id)
        }
        fn write_new<R: WorkItem>(&self, record: &R) -> Result<()> {
            self.inner.write_new(record)
        }
        fn replace<R: WorkItem>(&self, record: &R) -> Result<()> {
            self.inner.replace(record)
        }
        fn append_event(&self, project_id: &str, event: &Event) -> Result<()> {
            self.inner.append_event(project_id, event)
        }
        fn read_events(&self, project_id: &str) -> Result<Vec<Event>> {
            self.inner.read_events(project_id)
        }
        fn project_ids(&self) -> Result<Vec<String>> {
            self.inner.project_ids()
        }
        fn read_project(&self, project_id: &str) -> Result<crate::model::Project> {
            self.inner.read_project(project_id)
        }
        fn write_project(&self, project: &crate::model::Project) -> Result<()> {
            self.inner.write_project(project)
        }
        fn read_schema(&self, project_id: &str) -> Result<crate::model::ProjectSchema> {
            self.inner.read_schema(project_id)
        }
        fn write_schema(
            &self,
            project_id: &str,
            schema: &crate::model::ProjectSchema,
        ) -> Result<()> {
            self.inner.write_schema(project_id, schema)
        }
        fn delete_project(&self, project_id: &str) -> Result<()> {
            self.inner.delete_project(project_id)
        }
        fn check_writable(&self, project_id: &str) -> Result<()> {
            if project_id == self.project {
                return Err(crate::error::WorkflowError::PermissionDenied {
                    path: project_id.into(),
                });
            }
            self.inner.check_writable(project_id)
        }
    }

    #[test]
    fn read_only_dependent_project_is_refused_before_flipping() {
        let dir = tempfile::tempdir().unwrap();
        let inner = FsStore::new(dir.path());
        for project in ["api", "web"] {
            inner
                .write_project(&crate::model::Project {
                    id: project.into(),
                    name: project.into(),
                    description: None,
                    created_at: chrono::Utc::now(),
                    created_by: "tester".into(),
                })
                .unwrap();
        }
        let upstream = id::issue_id("api", "u");
        inner.write_new(&issue("api", "u", &[], IssueStatus::Resolved)).unwrap();
        inner
            .write_new(&issue("web", "d", &[upstream.as_str()], IssueStatus::Blocked))
            .unwrap();

        let store = ReadOnlyProject {
            inner,
            project: "web",
        };
        let mut index = ItemIndex::new(&store);
        let resolved = issue("api", "u", &[], IssueStatus::Resolved);
        let err = propagate(&mut index, &resolved).unwrap_err();
        assert!(matches!(err, crate::error::WorkflowError::PermissionDenied { .. }));

        let dependent: Issue = store.read_one("web", &id::issue_id("web", "d")).unwrap();
        assert_eq!(dependent.status, IssueStatus::Blocked);
        assert!(store.read_events("web").unwrap().is_empty());
    }

    #[test]
    fn cancelled_issue_never_satisfies() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let upstream = id::issue_id("api", "u");
        store.write_new(&issue("api", "u", &[], IssueStatus::Cancelled)).unwrap();
        store
            .write_new(&issue("api", "d", &[upstream.as_str()], IssueStatus::Blocked))
            .unwrap();

        let mut index = ItemIndex::new(&store);
        let cancelled = issue("api", "u", &[], IssueStatus::Cancelled);
        assert!(propagate(&mut index, &cancelled).unwrap().is_empty());
    }

    #[test]
    fn missing_dependency_keeps_record_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let upstream = id::issue_id("api", "u");
        let ghost = id::issue_id("api", "ghost");
        store.write_new(&issue("api", "u", &[], IssueStatus::Resolved)).unwrap();
        store
            .write_new(&issue(
                "api",
                "d",
                &[upstream.as_str(), ghost.as_str()],
                IssueStatus::Blocked,
            ))
            .unwrap();

        let mut index = ItemIndex::new(&store);
        let resolved = issue("api", "u", &[], IssueStatus::Resolved);
        assert!(propagate(&mut index, &resolved).unwrap().is_empty());
    }
}
