//! `workgraph-core` - dependency-aware workflow engine.
//!
//! Tracks projects → features → tasks, plus project-scoped issues. Records
//! of the same kind may depend on each other (across projects when the
//! project's schema allows it). The engine validates proposed edges, drives
//! each record through its kind's state machine and unblocks dependents
//! when a prerequisite completes. Data lives in plain JSONL files.
//!
//! # Quick Start
//!
//! ```no_run
//! use workgraph_core::{CreateProject, CreateTask, FsStore, Workflow};
//!
//! let workflow = Workflow::new(FsStore::new(".workgraph"));
//! workflow.create_project(CreateProject {
//!     id: "acme".into(),
//!     name: "Acme".into(),
//!     actor: "alice".into(),
//!     ..Default::default()
//! }).unwrap();
//!
//! let task = workflow.create_task(CreateTask {
//!     feature_id: "acme-feature-k3x9".into(),
//!     name: "Hash passwords".into(),
//!     goal: "Store argon2 hashes".into(),
//!     implementation_steps: vec!["add hasher".into()],
//!     test_cases: vec!["roundtrip".into()],
//!     derivable_files: vec!["src/auth.rs".into()],
//!     library_needs: vec!["argon2".into()],
//!     actor: "alice".into(),
//!     ..Default::default()
//! }).unwrap();
//! println!("{} is {}", task.base.id, task.status);
//! ```

pub mod cascade;
pub mod error;
pub mod id;
pub mod index;
pub mod jsonl;
pub mod lifecycle;
pub mod model;
pub mod query;
pub mod store;
pub mod validate;
pub mod workflow;

pub use error::{ErrorKind, Result, WorkflowError, exit_codes};
pub use lifecycle::{Action, Lifecycle, WorkItem};
pub use model::{
    DependencyRule, EntityKind, Event, EventType, Feature, FeatureStatus, Issue, IssueStatus,
    IssueType, ItemBase, Priority, Project, ProjectSchema, Scope, Task, TaskStatus,
};
pub use query::{
    CreateFeature, CreateIssue, CreateProject, CreateTask, DependencyState, Detail, ItemChanges,
    ListFilter, ProjectDetail, UpdateFeature, UpdateIssue, UpdateTask, Updated,
};
pub use store::{EntityStore, FsStore};
pub use workflow::Workflow;
