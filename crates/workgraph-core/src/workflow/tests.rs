use tempfile::TempDir;

use super::*;
use crate::model::{
    DependencyRule, EntityKind, Feature, FeatureStatus, Issue, IssueStatus, IssueType, Scope, Task,
    TaskStatus,
};
use crate::query::{
    CreateFeature, CreateIssue, CreateProject, CreateTask, UpdateFeature, UpdateIssue, UpdateTask,
};
use crate::store::FsStore;

fn workspace(projects: &[&str]) -> (TempDir, Workflow<FsStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.init().unwrap();
    let workflow = Workflow::new(store);
    for project in projects {
        workflow
            .create_project(CreateProject {
                id: (*project).to_string(),
                name: project.to_uppercase(),
                actor: "alice".into(),
                ..CreateProject::default()
            })
            .unwrap();
    }
    (dir, workflow)
}

fn feature(workflow: &Workflow<FsStore>, project: &str, deps: &[&str]) -> Feature {
    workflow
        .create_feature(CreateFeature {
            project_id: project.into(),
            name: "Login".into(),
            goal: "Users can sign in".into(),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            scope: Scope::Backend,
            actor: "alice".into(),
            ..CreateFeature::default()
        })
        .unwrap()
}

fn new_task(feature_id: &str, deps: &[&str]) -> CreateTask {
    CreateTask {
        feature_id: feature_id.into(),
        name: "Hash passwords".into(),
        goal: "Store argon2 hashes".into(),
        depends_on: deps.iter().map(ToString::to_string).collect(),
        implementation_steps: vec!["add hasher".into()],
        test_cases: vec!["verify roundtrip".into()],
        derivable_files: vec!["src/auth.rs".into()],
        library_needs: vec!["argon2".into()],
        actor: "alice".into(),
        ..CreateTask::default()
    }
}

fn task(workflow: &Workflow<FsStore>, feature_id: &str, deps: &[&str]) -> Task {
    workflow.create_task(new_task(feature_id, deps)).unwrap()
}

fn issue(workflow: &Workflow<FsStore>, project: &str, deps: &[&str]) -> Issue {
    workflow
        .create_issue(CreateIssue {
            project_id: project.into(),
            name: "Crash on empty input".into(),
            goal: "No panic".into(),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            issue_type: IssueType::Bug,
            actor: "bob".into(),
            ..CreateIssue::default()
        })
        .unwrap()
}

fn set_task_status(workflow: &Workflow<FsStore>, id: &str, status: TaskStatus) -> Result<Updated<Task>> {
    workflow.update_task(UpdateTask {
        id: id.into(),
        status: Some(status),
        changes: ItemChanges {
            actor: "alice".into(),
            ..ItemChanges::default()
        },
        ..UpdateTask::default()
    })
}

fn task_action(
    workflow: &Workflow<FsStore>,
    id: &str,
    action: Action,
    reason: Option<&str>,
    force: bool,
) -> Result<Updated<Task>> {
    workflow.update_task(UpdateTask {
        id: id.into(),
        action: Some(action),
        changes: ItemChanges {
            reason: reason.map(ToString::to_string),
            force,
            actor: "alice".into(),
            ..ItemChanges::default()
        },
        ..UpdateTask::default()
    })
}

fn issue_action(
    workflow: &Workflow<FsStore>,
    id: &str,
    action: Action,
    reason: Option<&str>,
) -> Result<Updated<Issue>> {
    workflow.update_issue(UpdateIssue {
        id: id.into(),
        action: Some(action),
        changes: ItemChanges {
            reason: reason.map(ToString::to_string),
            actor: "bob".into(),
            ..ItemChanges::default()
        },
        ..UpdateIssue::default()
    })
}

#[test]
fn done_task_unblocks_its_dependent() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    assert_eq!(t1.status, TaskStatus::Ready);
    let t2 = task(&workflow, parent.id(), &[t1.id()]);
    assert_eq!(t2.status, TaskStatus::Blocked);

    set_task_status(&workflow, t1.id(), TaskStatus::InProgress).unwrap();
    let done = set_task_status(&workflow, t1.id(), TaskStatus::Done).unwrap();
    assert_eq!(done.changes, vec!["status"]);
    assert_eq!(done.unblocked, vec![t2.id().to_string()]);

    let detail = workflow.task(t2.id()).unwrap();
    assert_eq!(detail.record.status, TaskStatus::Ready);
    assert!(detail.dependencies[0].satisfied);

    let events = workflow.store().read_events("acme").unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.id, t2.id());
    assert_eq!(last.event_type, EventType::Ready);
    assert_eq!(last.by, SYSTEM_ACTOR);
}

#[test]
fn completion_flips_only_fully_satisfied_dependents() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    let unrelated = task(&workflow, parent.id(), &[]);
    let only = task(&workflow, parent.id(), &[t1.id()]);
    let both = task(&workflow, parent.id(), &[t1.id(), unrelated.id()]);
    assert_eq!(both.status, TaskStatus::Blocked);

    set_task_status(&workflow, t1.id(), TaskStatus::InProgress).unwrap();
    let done = set_task_status(&workflow, t1.id(), TaskStatus::Done).unwrap();
    assert_eq!(done.unblocked, vec![only.id().to_string()]);

    assert_eq!(workflow.task(only.id()).unwrap().record.status, TaskStatus::Ready);
    assert_eq!(workflow.task(both.id()).unwrap().record.status, TaskStatus::Blocked);
}

#[test]
fn create_logs_created_then_derived_status() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    let t2 = task(&workflow, parent.id(), &[t1.id()]);

    let events: Vec<Event> = workflow
        .store()
        .read_events("acme")
        .unwrap()
        .into_iter()
        .filter(|event| event.id == t2.id())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::Created);
    assert_eq!(events[0].by, "alice");
    assert_eq!(events[1].event_type, EventType::Blocked);
    assert_eq!(events[1].by, SYSTEM_ACTOR);
}

#[test]
fn create_with_satisfied_dependencies_is_unblocked() {
    let (_dir, workflow) = workspace(&["acme"]);
    let upstream = issue(&workflow, "acme", &[]);
    assert_eq!(upstream.status, IssueStatus::Open);
    issue_action(&workflow, upstream.id(), Action::Resolve, None).unwrap();

    let downstream = issue(&workflow, "acme", &[upstream.id()]);
    assert_eq!(downstream.status, IssueStatus::Ready);
}

#[test]
fn task_create_requires_lists_and_existing_feature() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);

    let mut input = new_task(parent.id(), &[]);
    input.library_needs.clear();
    let err = workflow.create_task(input).unwrap_err();
    assert!(err.to_string().contains("library_needs"));
    assert_eq!(err.exit_code(), 2);

    let err = workflow
        .create_task(new_task("acme-feature-missing", &[]))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[test]
fn create_in_unknown_project_fails() {
    let (_dir, workflow) = workspace(&["acme"]);
    let err = workflow
        .create_feature(CreateFeature {
            project_id: "ghost".into(),
            name: "n".into(),
            goal: "g".into(),
            actor: "a".into(),
            ..CreateFeature::default()
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ProjectNotFound { .. }));
}

#[test]
fn illegal_transition_names_pair_and_leaves_record() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);

    let err = set_task_status(&workflow, t1.id(), TaskStatus::Done).unwrap_err();
    assert!(err.to_string().contains("ready -> done"));
    assert_eq!(workflow.task(t1.id()).unwrap().record.status, TaskStatus::Ready);
}

#[test]
fn done_task_is_locked() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    set_task_status(&workflow, t1.id(), TaskStatus::InProgress).unwrap();
    set_task_status(&workflow, t1.id(), TaskStatus::Done).unwrap();

    let err = workflow
        .update_task(UpdateTask {
            id: t1.id().into(),
            changes: ItemChanges {
                name: Some("renamed".into()),
                actor: "alice".into(),
                ..ItemChanges::default()
            },
            ..UpdateTask::default()
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Locked { .. }));
}

#[test]
fn cancel_requires_reason_and_respects_dependents() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    let t2 = task(&workflow, parent.id(), &[t1.id()]);

    let err = task_action(&workflow, t1.id(), Action::Cancel, None, false).unwrap_err();
    assert!(err.to_string().contains("reason"));

    let err = task_action(&workflow, t1.id(), Action::Cancel, Some("scrapped"), false).unwrap_err();
    match err {
        WorkflowError::HasDependents { count, dependents, .. } => {
            assert_eq!(count, 1);
            assert_eq!(dependents, vec![t2.id().to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let cancelled = task_action(&workflow, t1.id(), Action::Cancel, Some("scrapped"), true).unwrap();
    assert_eq!(cancelled.record.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.record.base.reason.as_deref(), Some("scrapped"));
    // Cancelled tasks satisfy their dependents.
    assert_eq!(cancelled.unblocked, vec![t2.id().to_string()]);
}

#[test]
fn plain_cancelled_status_goes_through_cancel_guards() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);

    let err = set_task_status(&workflow, t1.id(), TaskStatus::Cancelled).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation { ref field, .. } if field == "reason"));
}

#[test]
fn reopen_clears_reason() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    task_action(&workflow, t1.id(), Action::Cancel, Some("dup"), false).unwrap();

    let reopened = task_action(&workflow, t1.id(), Action::Reopen, None, false).unwrap();
    assert_eq!(reopened.record.status, TaskStatus::Pending);
    assert_eq!(reopened.record.base.reason, None);
    assert_eq!(reopened.changes, vec!["status", "reason"]);
}

#[test]
fn issue_only_actions_rejected_on_tasks() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);

    let err = task_action(&workflow, t1.id(), Action::Resolve, None, false).unwrap_err();
    assert!(matches!(err, WorkflowError::ActionRejected { .. }));
}

#[test]
fn issue_lifecycle_with_wontfix_and_reopen() {
    let (_dir, workflow) = workspace(&["acme"]);
    let upstream = issue(&workflow, "acme", &[]);
    let downstream = issue(&workflow, "acme", &[upstream.id()]);
    assert_eq!(downstream.status, IssueStatus::Blocked);

    let started = issue_action(&workflow, upstream.id(), Action::Start, None).unwrap();
    assert_eq!(started.record.status, IssueStatus::InProgress);

    let err = issue_action(&workflow, upstream.id(), Action::Wontfix, None).unwrap_err();
    assert!(err.to_string().contains("reason"));

    let wontfix = issue_action(&workflow, upstream.id(), Action::Wontfix, Some("works as intended")).unwrap();
    assert_eq!(wontfix.unblocked, vec![downstream.id().to_string()]);

    let reopened = issue_action(&workflow, upstream.id(), Action::Reopen, None).unwrap();
    assert_eq!(reopened.record.status, IssueStatus::Open);
}

#[test]
fn cancelled_issue_does_not_unblock_and_is_unusable() {
    let (_dir, workflow) = workspace(&["acme"]);
    let upstream = issue(&workflow, "acme", &[]);
    let downstream = issue(&workflow, "acme", &[upstream.id()]);

    let cancelled = issue_action(&workflow, upstream.id(), Action::Cancel, Some("dup")).unwrap();
    assert!(cancelled.unblocked.is_empty());
    assert_eq!(workflow.issue(downstream.id()).unwrap().record.status, IssueStatus::Blocked);

    let err = workflow
        .create_issue(CreateIssue {
            project_id: "acme".into(),
            name: "n".into(),
            goal: "g".into(),
            depends_on: vec![upstream.id().to_string()],
            actor: "bob".into(),
            ..CreateIssue::default()
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::UnusableDependency { .. }));
}

#[test]
fn update_rejects_cycle() {
    let (_dir, workflow) = workspace(&["acme"]);
    let a = feature(&workflow, "acme", &[]);
    let b = feature(&workflow, "acme", &[a.id()]);

    let err = workflow
        .update_feature(UpdateFeature {
            id: a.id().into(),
            changes: ItemChanges {
                add_dependencies: vec![b.id().to_string()],
                actor: "alice".into(),
                ..ItemChanges::default()
            },
            ..UpdateFeature::default()
        })
        .unwrap_err();
    match err {
        WorkflowError::CircularDependency { path } => {
            assert_eq!(path, vec![a.id(), b.id(), a.id()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dependency_change_rederives_blocked_state() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    let t2 = task(&workflow, parent.id(), &[]);

    let blocked = workflow
        .update_task(UpdateTask {
            id: t2.id().into(),
            changes: ItemChanges {
                add_dependencies: vec![t1.id().to_string()],
                actor: "alice".into(),
                ..ItemChanges::default()
            },
            ..UpdateTask::default()
        })
        .unwrap();
    assert_eq!(blocked.record.status, TaskStatus::Blocked);
    assert_eq!(blocked.changes, vec!["depends_on", "status"]);

    let ready = workflow
        .update_task(UpdateTask {
            id: t2.id().into(),
            changes: ItemChanges {
                remove_dependencies: vec![t1.id().to_string()],
                actor: "alice".into(),
                ..ItemChanges::default()
            },
            ..UpdateTask::default()
        })
        .unwrap();
    assert_eq!(ready.record.status, TaskStatus::Ready);
    assert!(ready.record.base.depends_on.is_empty());
}

#[test]
fn changes_list_only_names_changed_fields() {
    let (_dir, workflow) = workspace(&["acme"]);
    let f = feature(&workflow, "acme", &[]);

    let updated = workflow
        .update_feature(UpdateFeature {
            id: f.id().into(),
            changes: ItemChanges {
                name: Some("Login".into()),
                goal: Some("Sign in with SSO".into()),
                actor: "carol".into(),
                ..ItemChanges::default()
            },
            scope: Some(Scope::Fullstack),
            ..UpdateFeature::default()
        })
        .unwrap();
    assert_eq!(updated.changes, vec!["goal", "scope"]);
    assert_eq!(updated.record.base.updated_by, "carol");

    let detail = workflow.feature(f.id()).unwrap();
    assert_eq!(detail.record.base.goal, "Sign in with SSO");
    assert_eq!(detail.record.base.name, "Login");
    assert_eq!(detail.event_count, 3);
}

#[test]
fn feature_cascade_returns_to_draft() {
    let (_dir, workflow) = workspace(&["acme"]);
    let base = feature(&workflow, "acme", &[]);
    let top = feature(&workflow, "acme", &[base.id()]);
    assert_eq!(top.status, FeatureStatus::Blocked);

    let done = workflow
        .update_feature(UpdateFeature {
            id: base.id().into(),
            status: Some(FeatureStatus::Done),
            changes: ItemChanges {
                actor: "alice".into(),
                ..ItemChanges::default()
            },
            ..UpdateFeature::default()
        })
        .unwrap();
    assert_eq!(done.unblocked, vec![top.id().to_string()]);
    assert_eq!(workflow.feature(top.id()).unwrap().record.status, FeatureStatus::Draft);
}

fn feature_changes(changes: ItemChanges) -> UpdateFeature {
    UpdateFeature {
        changes: ItemChanges {
            actor: "alice".into(),
            ..changes
        },
        ..UpdateFeature::default()
    }
}

#[test]
fn self_dependency_rejected_for_features_and_issues() {
    let (_dir, workflow) = workspace(&["acme"]);
    let login = feature(&workflow, "acme", &[]);
    let crash = issue(&workflow, "acme", &[]);

    let added = workflow
        .update_feature(UpdateFeature {
            id: login.id().into(),
            ..feature_changes(ItemChanges {
                add_dependencies: vec![login.id().to_string()],
                ..ItemChanges::default()
            })
        })
        .unwrap_err();
    assert!(matches!(added, WorkflowError::SelfDependency { .. }), "{added}");

    let replaced = workflow
        .update_feature(UpdateFeature {
            id: login.id().into(),
            ..feature_changes(ItemChanges {
                depends_on: Some(vec![login.id().to_string()]),
                ..ItemChanges::default()
            })
        })
        .unwrap_err();
    assert!(matches!(replaced, WorkflowError::SelfDependency { .. }), "{replaced}");

    for changes in [
        ItemChanges {
            add_dependencies: vec![crash.id().to_string()],
            actor: "bob".into(),
            ..ItemChanges::default()
        },
        ItemChanges {
            depends_on: Some(vec![crash.id().to_string()]),
            actor: "bob".into(),
            ..ItemChanges::default()
        },
    ] {
        let err = workflow
            .update_issue(UpdateIssue {
                id: crash.id().into(),
                changes,
                ..UpdateIssue::default()
            })
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SelfDependency { .. }), "{err}");
    }

    assert!(workflow.feature(login.id()).unwrap().record.depends_on().is_empty());
    assert!(workflow.issue(crash.id()).unwrap().record.depends_on().is_empty());
}

#[test]
fn feature_cancel_refused_while_dependents_are_active() {
    let (_dir, workflow) = workspace(&["acme"]);
    let base = feature(&workflow, "acme", &[]);
    let top = feature(&workflow, "acme", &[base.id()]);

    let cancel = |force: bool| {
        workflow.update_feature(UpdateFeature {
            id: base.id().into(),
            action: Some(Action::Cancel),
            ..feature_changes(ItemChanges {
                reason: Some("descoped".into()),
                force,
                ..ItemChanges::default()
            })
        })
    };

    match cancel(false).unwrap_err() {
        WorkflowError::HasDependents { count, dependents, .. } => {
            assert_eq!(count, 1);
            assert_eq!(dependents, vec![top.id().to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(workflow.feature(base.id()).unwrap().record.status, FeatureStatus::Draft);

    let cancelled = cancel(true).unwrap();
    assert_eq!(cancelled.record.status, FeatureStatus::Cancelled);
    assert_eq!(cancelled.unblocked, vec![top.id().to_string()]);
}

#[test]
fn cross_project_edges_follow_rule_and_cascade() {
    let (_dir, workflow) = workspace(&["api", "web"]);
    let upstream = issue(&workflow, "api", &[]);

    let err = workflow
        .create_issue(CreateIssue {
            project_id: "web".into(),
            name: "Show errors".into(),
            goal: "g".into(),
            depends_on: vec![upstream.id().to_string()],
            actor: "bob".into(),
            ..CreateIssue::default()
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DependencyRuleViolation { .. }));

    workflow
        .set_dependency_rule("web", EntityKind::Issue, DependencyRule::CrossProjectAllowed, "alice")
        .unwrap();
    let downstream = issue(&workflow, "web", &[upstream.id()]);
    assert_eq!(downstream.status, IssueStatus::Blocked);

    let resolved = issue_action(&workflow, upstream.id(), Action::Resolve, None).unwrap();
    assert_eq!(resolved.unblocked, vec![downstream.id().to_string()]);

    let err = workflow.delete_project("api", false).unwrap_err();
    assert!(matches!(err, WorkflowError::HasDependents { .. }));
    workflow.delete_project("api", true).unwrap();
    assert_eq!(workflow.list_projects().unwrap().len(), 1);
}

#[test]
fn list_sorts_by_priority_then_age_and_filters() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let low = task(&workflow, parent.id(), &[]);
    let mut urgent_input = new_task(parent.id(), &[]);
    urgent_input.priority = Some(Priority::P0);
    let urgent = workflow.create_task(urgent_input).unwrap();
    let blocked = task(&workflow, parent.id(), &[low.id()]);

    let all = workflow.list_tasks(&ListFilter::project("acme")).unwrap();
    let ids: Vec<&str> = all.iter().map(WorkItem::id).collect();
    assert_eq!(ids, vec![urgent.id(), low.id(), blocked.id()]);

    let mut filter = ListFilter::project("acme");
    filter.statuses = vec![TaskStatus::Blocked];
    let only_blocked = workflow.list_tasks(&filter).unwrap();
    assert_eq!(only_blocked.len(), 1);

    let mut filter = ListFilter::project("acme");
    filter.limit = Some(1);
    assert_eq!(workflow.list_tasks(&filter).unwrap().len(), 1);
}

#[test]
fn detail_reports_dependents() {
    let (_dir, workflow) = workspace(&["acme"]);
    let parent = feature(&workflow, "acme", &[]);
    let t1 = task(&workflow, parent.id(), &[]);
    let t2 = task(&workflow, parent.id(), &[t1.id()]);

    let detail = workflow.task(t1.id()).unwrap();
    assert_eq!(detail.dependents, vec![t2.id().to_string()]);
    assert!(detail.dependencies.is_empty());
    assert_eq!(detail.event_count, 2);
}

#[test]
fn project_ids_are_validated_and_unique() {
    let (_dir, workflow) = workspace(&["acme"]);
    let err = workflow
        .create_project(CreateProject {
            id: "acme".into(),
            name: "Again".into(),
            actor: "a".into(),
            ..CreateProject::default()
        })
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ProjectExists { .. }));

    let err = workflow
        .create_project(CreateProject {
            id: "Bad_Id".into(),
            name: "Bad".into(),
            actor: "a".into(),
            ..CreateProject::default()
        })
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
