//! Workflow facade.
//!
//! [`Workflow`] sequences the engine for each operation: load the project
//! schema and the target record, validate fields and proposed edges,
//! compute the resulting status, persist, append events and finally run the
//! unblock cascade. Everything is checked before the first write; the
//! cascade runs after the triggering record is persisted, so a storage
//! failure inside it leaves that record updated.
//!
//! The per-kind entry points live in the submodules and all funnel into the
//! generic `create_item` / `update_item` / `list_items` / `detail_item`.

mod feature;
mod issue;
mod project;
mod task;

use std::collections::HashSet;

use tracing::{debug, info};

use crate::cascade;
use crate::error::{Result, WorkflowError};
use crate::id::{self, IdSeed};
use crate::index::ItemIndex;
use crate::lifecycle::{Action, Lifecycle, Refusal, WorkItem, check_transition};
use crate::model::{Event, EventType, ItemBase, Priority, SYSTEM_ACTOR};
use crate::query::{DependencyState, Detail, ItemChanges, ListFilter, Updated};
use crate::store::EntityStore;
use crate::validate::{DependencyValidator, FieldRules, ItemValidator};

/// Entry point for every workflow operation.
#[derive(Debug, Clone)]
pub struct Workflow<S: EntityStore> {
    store: S,
}

/// What an update asks of the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusRequest<St> {
    Keep,
    Plain(St),
    Named(Action),
}

impl<St: Lifecycle> StatusRequest<St> {
    fn resolve(current: St, status: Option<St>, action: Option<Action>) -> Result<Self> {
        match (status, action) {
            (Some(_), Some(_)) => Err(WorkflowError::validation(
                "status",
                "cannot be combined with a named action",
            )),
            (None, Some(action)) => Ok(Self::Named(action)),
            (Some(requested), None) if requested == current => Ok(Self::Keep),
            (Some(requested), None) => Ok(requested
                .promoted_action()
                .map_or(Self::Plain(requested), Self::Named)),
            (None, None) => Ok(Self::Keep),
        }
    }
}

impl<S: EntityStore> Workflow<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Validate, assign an ID, derive the initial status and persist.
    ///
    /// `owner` is the ID prefix (project ID, or feature ID for tasks).
    fn create_item<R: WorkItem + FieldRules>(
        &self,
        mut record: R,
        owner: &str,
        priority: Option<Priority>,
    ) -> Result<R> {
        let project_id = record.project_id().to_string();
        self.store.read_project(&project_id)?;
        let schema = self.store.read_schema(&project_id)?;

        record.base_mut().priority = priority.unwrap_or(schema.rules.priority.default);
        ItemValidator::validate(&record, &schema, true)?;

        let mut index: ItemIndex<'_, S, R> = ItemIndex::new(&self.store);
        DependencyValidator::validate(&mut index, &project_id, None, record.depends_on())?;
        self.store.check_writable(&project_id)?;

        let existing: HashSet<String> = index
            .project_records(&project_id)?
            .iter()
            .map(|existing| existing.id().to_string())
            .collect();
        let base = record.base();
        let seed = IdSeed {
            owner,
            name: &base.name,
            actor: &base.created_by,
            created_at: base.created_at,
        };
        let new_id = id::generate(R::KIND, seed, existing.len(), |candidate| {
            existing.contains(candidate)
        });
        record.base_mut().id = new_id;

        let status = if record.depends_on().is_empty() {
            R::Status::initial()
        } else if cascade::all_satisfied(&mut index, &record)? {
            R::Status::unblocked()
        } else {
            R::Status::blocked()
        };
        record.set_status(status);

        self.store.write_new(&record)?;
        let layer = R::KIND.as_str();
        self.store.append_event(
            &project_id,
            &Event::new(layer, EventType::Created, record.id(), &record.base().created_by),
        )?;
        let derived = if status == R::Status::blocked() {
            EventType::Blocked
        } else {
            EventType::Ready
        };
        self.store
            .append_event(&project_id, &Event::new(layer, derived, record.id(), SYSTEM_ACTOR))?;

        info!(kind = %R::KIND, id = %record.id(), status = %status, "Created record");
        Ok(record)
    }

    /// Apply common and kind-specific changes plus a status request.
    ///
    /// `apply` edits the kind's own fields and names each field it changed.
    fn update_item<R, F>(
        &self,
        record_id: &str,
        changes: &ItemChanges,
        status: Option<R::Status>,
        action: Option<Action>,
        apply: F,
    ) -> Result<Updated<R>>
    where
        R: WorkItem + FieldRules,
        F: FnOnce(&mut R, &mut Vec<String>),
    {
        let project_id = id::parse_as(R::KIND, record_id)?.project_id;
        let mut index = ItemIndex::new(&self.store);
        let current: R = index
            .get(record_id)?
            .cloned()
            .ok_or_else(|| WorkflowError::not_found(R::KIND, record_id))?;
        let from = current.status();

        let request = StatusRequest::resolve(from, status, action)?;
        let lifting_lock = matches!(
            request,
            StatusRequest::Named(Action::Reopen | Action::Cancel)
        );
        if from.is_locked() && !lifting_lock {
            return Err(WorkflowError::Locked {
                kind: R::KIND.to_string(),
                id: record_id.to_string(),
                status: from.to_string(),
            });
        }

        let reason = changes
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty());
        let takes_reason = matches!(
            request,
            StatusRequest::Named(Action::Cancel | Action::Wontfix)
        );
        if reason.is_some() && !takes_reason {
            return Err(WorkflowError::validation(
                "reason",
                "only accepted with cancel or wontfix",
            ));
        }

        let mut record = current.clone();
        let mut changed: Vec<String> = Vec::new();
        apply_common(record.base_mut(), changes, &mut changed);

        let old_deps = current.depends_on();
        let new_deps = merge_dependencies(old_deps, changes);
        let added: Vec<String> = new_deps
            .iter()
            .filter(|dep| !old_deps.contains(dep))
            .cloned()
            .collect();
        let deps_changed = new_deps.as_slice() != old_deps;
        if deps_changed {
            record.base_mut().depends_on = new_deps;
            note(&mut changed, "depends_on");
        }

        apply(&mut record, &mut changed);

        match request {
            StatusRequest::Keep => {}
            StatusRequest::Plain(to) => {
                check_transition(R::KIND, from, to)?;
                record.set_status(to);
                note(&mut changed, "status");
            }
            StatusRequest::Named(action) => {
                if action.requires_reason() && reason.is_none() {
                    return Err(WorkflowError::validation(
                        "reason",
                        format!("{action} requires a reason"),
                    ));
                }
                let to = from.apply_action(action).map_err(|refusal| {
                    WorkflowError::ActionRejected {
                        action: action.to_string(),
                        kind: R::KIND.to_string(),
                        id: record_id.to_string(),
                        reason: match refusal {
                            Refusal::Unsupported => {
                                format!("{} records do not support {action}", R::KIND)
                            }
                            Refusal::NotFrom(message) => message,
                        },
                    }
                })?;

                if action == Action::Cancel
                    && R::Status::guards_dependents_on_cancel()
                    && !changes.force
                {
                    let dependents = self.dependents_of(&mut index, record_id, |dependent: &R| {
                        !dependent.status().is_terminal()
                    })?;
                    if !dependents.is_empty() {
                        return Err(WorkflowError::HasDependents {
                            id: record_id.to_string(),
                            count: dependents.len(),
                            dependents,
                        });
                    }
                }

                record.set_status(to);
                note(&mut changed, "status");
                match action {
                    Action::Cancel | Action::Wontfix => {
                        record.base_mut().reason = reason.map(ToString::to_string);
                        note(&mut changed, "reason");
                    }
                    Action::Reopen => {
                        if record.base_mut().reason.take().is_some() {
                            note(&mut changed, "reason");
                        }
                    }
                    Action::Start | Action::Resolve => {}
                }
            }
        }

        if changed.is_empty() {
            debug!(kind = %R::KIND, id = %record_id, "Update changed nothing");
            return Ok(Updated {
                record: current,
                changes: changed,
                unblocked: Vec::new(),
            });
        }

        let schema = self.store.read_schema(&project_id)?;
        ItemValidator::validate(&record, &schema, false)?;
        DependencyValidator::validate(&mut index, &project_id, Some(record_id), &added)?;

        if deps_changed && request == StatusRequest::Keep && from.is_derivable() {
            let satisfied = cascade::all_satisfied(&mut index, &record)?;
            let derived = match (satisfied, from == R::Status::blocked()) {
                (true, true) => R::Status::unblocked(),
                (false, _) => R::Status::blocked(),
                (true, false) => from,
            };
            if derived != from {
                record.set_status(derived);
                note(&mut changed, "status");
            }
        }

        self.store.check_writable(&project_id)?;
        record.base_mut().touch(&changes.actor);
        self.store.replace(&record)?;
        self.store.append_event(
            &project_id,
            &Event::new(R::KIND.as_str(), EventType::Updated, record_id, &changes.actor)
                .with_changes(changed.clone()),
        )?;
        info!(kind = %R::KIND, id = %record_id, changes = ?changed, "Updated record");

        let to = record.status();
        let unblocked = if to != from && to.is_satisfying() {
            cascade::propagate(&mut index, &record)?
        } else {
            Vec::new()
        };

        Ok(Updated {
            record,
            changes: changed,
            unblocked,
        })
    }

    /// Records of one kind in a project, sorted by priority, creation time, ID.
    fn list_items<R: WorkItem>(
        &self,
        filter: &ListFilter<R::Status>,
        extra: impl Fn(&R) -> bool,
    ) -> Result<Vec<R>> {
        self.store.read_project(&filter.project_id)?;
        let mut records: Vec<R> = self
            .store
            .read_all::<R>(&filter.project_id)?
            .into_iter()
            .filter(|record| {
                (filter.statuses.is_empty() || filter.statuses.contains(&record.status()))
                    && (filter.priorities.is_empty()
                        || filter.priorities.contains(&record.base().priority))
                    && extra(record)
            })
            .collect();

        records.sort_by(|a, b| {
            a.base()
                .priority
                .cmp(&b.base().priority)
                .then_with(|| a.base().created_at.cmp(&b.base().created_at))
                .then_with(|| a.id().cmp(b.id()))
        });
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    fn detail_item<R: WorkItem>(&self, record_id: &str) -> Result<Detail<R>> {
        let project_id = id::parse_as(R::KIND, record_id)?.project_id;
        let mut index = ItemIndex::new(&self.store);
        let record: R = index
            .get(record_id)?
            .cloned()
            .ok_or_else(|| WorkflowError::not_found(R::KIND, record_id))?;

        let event_count = self
            .store
            .read_events(&project_id)?
            .iter()
            .filter(|event| event.id == record_id)
            .count();

        let mut dependencies = Vec::with_capacity(record.depends_on().len());
        for dep in record.depends_on() {
            let state = match index.find(dep)? {
                Some(found) => DependencyState {
                    id: dep.clone(),
                    status: Some(found.status().to_string()),
                    satisfied: found.status().is_satisfying(),
                },
                None => DependencyState {
                    id: dep.clone(),
                    status: None,
                    satisfied: false,
                },
            };
            dependencies.push(state);
        }

        let dependents = self.dependents_of(&mut index, record_id, |_: &R| true)?;
        Ok(Detail {
            record,
            event_count,
            dependencies,
            dependents,
        })
    }

    /// IDs of same-kind records in any project that list `target` and match `keep`.
    fn dependents_of<R: WorkItem>(
        &self,
        index: &mut ItemIndex<'_, S, R>,
        target: &str,
        keep: impl Fn(&R) -> bool,
    ) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for project in self.store.project_ids()? {
            for record in index.project_records(&project)? {
                if record.depends_on().iter().any(|dep| dep == target) && keep(record) {
                    found.push(record.id().to_string());
                }
            }
        }
        Ok(found)
    }
}

fn note(changed: &mut Vec<String>, field: &str) {
    if !changed.iter().any(|existing| existing == field) {
        changed.push(field.to_string());
    }
}

/// Overwrite `slot` with `value` if given and different, noting `field`.
pub(crate) fn set_field<T: PartialEq>(
    slot: &mut T,
    value: Option<T>,
    field: &str,
    changed: &mut Vec<String>,
) {
    if let Some(value) = value {
        if *slot != value {
            *slot = value;
            note(changed, field);
        }
    }
}

fn apply_common(base: &mut ItemBase, changes: &ItemChanges, changed: &mut Vec<String>) {
    set_field(&mut base.name, changes.name.clone(), "name", changed);
    set_field(&mut base.goal, changes.goal.clone(), "goal", changed);
    set_field(&mut base.priority, changes.priority, "priority", changed);
}

/// Replace, then add (skipping IDs already present), then remove.
fn merge_dependencies(current: &[String], changes: &ItemChanges) -> Vec<String> {
    let mut deps = changes
        .depends_on
        .clone()
        .unwrap_or_else(|| current.to_vec());
    for dep in &changes.add_dependencies {
        if !deps.contains(dep) {
            deps.push(dep.clone());
        }
    }
    deps.retain(|dep| !changes.remove_dependencies.contains(dep));
    deps
}

#[cfg(test)]
mod tests;
