//! Per-invocation record index.
//!
//! Records of one kind live in an arena; a map from ID to arena slot gives
//! constant-time lookup. Projects are loaded lazily, so each entity file is
//! parsed at most once per operation no matter how many dependency hops or
//! cascade passes touch it. Nothing is persisted: the on-disk format stays
//! plain JSONL.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::Result;
use crate::id;
use crate::lifecycle::WorkItem;
use crate::store::EntityStore;

pub struct ItemIndex<'s, S: EntityStore, R: WorkItem> {
    store: &'s S,
    arena: Vec<R>,
    slots: HashMap<String, usize>,
    by_project: HashMap<String, Vec<usize>>,
    loaded: HashSet<String>,
}

impl<'s, S: EntityStore, R: WorkItem> ItemIndex<'s, S, R> {
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            arena: Vec::new(),
            slots: HashMap::new(),
            by_project: HashMap::new(),
            loaded: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &'s S {
        self.store
    }

    /// Load a project's records if not already loaded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the project's file cannot be read.
    pub fn load_project(&mut self, project_id: &str) -> Result<()> {
        if self.loaded.contains(project_id) {
            return Ok(());
        }
        let records = self.store.read_all::<R>(project_id)?;
        debug!(kind = %R::KIND, project = project_id, count = records.len(), "Indexed project");

        let slots = self.by_project.entry(project_id.to_string()).or_default();
        for record in records {
            // Already upserted in this invocation.
            if self.slots.contains_key(record.id()) {
                continue;
            }
            let slot = self.arena.len();
            self.slots.insert(record.id().to_string(), slot);
            slots.push(slot);
            self.arena.push(record);
        }
        self.loaded.insert(project_id.to_string());
        Ok(())
    }

    /// Look up a record by ID, loading its owning project on demand.
    ///
    /// # Errors
    ///
    /// Returns `MalformedId` if the ID's project cannot be recovered, or a
    /// storage error.
    pub fn get(&mut self, record_id: &str) -> Result<Option<&R>> {
        let parsed = id::parse_as(R::KIND, record_id)?;
        self.load_project(&parsed.project_id)?;
        Ok(self.slots.get(record_id).map(|&slot| &self.arena[slot]))
    }

    /// Like [`get`](Self::get) but never fails: unparsable IDs and missing
    /// records both come back as `None`.
    ///
    /// # Errors
    ///
    /// Returns a storage error only.
    pub fn find(&mut self, record_id: &str) -> Result<Option<&R>> {
        let Ok(parsed) = id::parse_as(R::KIND, record_id) else {
            return Ok(None);
        };
        self.load_project(&parsed.project_id)?;
        Ok(self.slots.get(record_id).map(|&slot| &self.arena[slot]))
    }

    /// All records of a project, in file order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the project's file cannot be read.
    pub fn project_records(&mut self, project_id: &str) -> Result<Vec<&R>> {
        self.load_project(project_id)?;
        Ok(self
            .by_project
            .get(project_id)
            .map(|slots| slots.iter().map(|&slot| &self.arena[slot]).collect())
            .unwrap_or_default())
    }

    /// Record a mutation so later lookups in this invocation see it.
    pub fn upsert(&mut self, record: R) {
        if let Some(&slot) = self.slots.get(record.id()) {
            self.arena[slot] = record;
            return;
        }
        let slot = self.arena.len();
        self.slots.insert(record.id().to_string(), slot);
        self.by_project
            .entry(record.project_id().to_string())
            .or_default()
            .push(slot);
        self.arena.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, IssueStatus, IssueType, ItemBase};
    use crate::store::FsStore;

    fn issue(project: &str, suffix: &str) -> Issue {
        let mut base = ItemBase::new(project, suffix, "goal", "tester");
        base.id = id::issue_id(project, suffix);
        Issue {
            base,
            status: IssueStatus::Open,
            issue_type: IssueType::Bug,
            affected_files: Vec::new(),
            affected_tests: Vec::new(),
            implementation_steps: Vec::new(),
            library_needs: Vec::new(),
        }
    }

    #[test]
    fn resolves_across_projects_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.write_new(&issue("web", "a1")).unwrap();
        store.write_new(&issue("api", "b2")).unwrap();

        let mut index: ItemIndex<'_, _, Issue> = ItemIndex::new(&store);
        assert!(index.get("web-issue-a1").unwrap().is_some());
        assert!(index.get("api-issue-b2").unwrap().is_some());
        assert!(index.get("api-issue-zz").unwrap().is_none());
        assert!(index.get("not-an-id").is_err());
        assert!(index.find("not-an-id").unwrap().is_none());
    }

    #[test]
    fn upsert_overrides_loaded_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.write_new(&issue("web", "a1")).unwrap();

        let mut index: ItemIndex<'_, _, Issue> = ItemIndex::new(&store);
        index.load_project("web").unwrap();
        let mut changed = issue("web", "a1");
        changed.status = IssueStatus::Resolved;
        index.upsert(changed);

        let found = index.get("web-issue-a1").unwrap().unwrap();
        assert_eq!(found.status, IssueStatus::Resolved);
        assert_eq!(index.project_records("web").unwrap().len(), 1);
    }
}
