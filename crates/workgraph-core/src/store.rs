//! Entity store.
//!
//! The engine only talks to storage through [`EntityStore`]. [`FsStore`]
//! keeps one directory per project:
//!
//! ```text
//! <root>/projects/<project>/
//!     project.json
//!     schema.json
//!     features.jsonl
//!     tasks.jsonl
//!     issues.jsonl
//!     events.jsonl
//! ```
//!
//! `replace` drops the old line and appends the new one at the end of the
//! file, so file order is insertion order only until the first update.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::jsonl;
use crate::lifecycle::WorkItem;
use crate::model::{EntityKind, Event, Project, ProjectSchema};

const PROJECTS_DIR: &str = "projects";
const PROJECT_FILE: &str = "project.json";
const SCHEMA_FILE: &str = "schema.json";
const EVENTS_FILE: &str = "events.jsonl";

/// Persistence contract consumed by the workflow engine.
pub trait EntityStore {
    /// Every record of kind `R` in a project, in file order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be read or parsed.
    fn read_all<R: WorkItem>(&self, project_id: &str) -> Result<Vec<R>>;

    /// Append a new record to its project's file.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn write_new<R: WorkItem>(&self, record: &R) -> Result<()>;

    /// Rewrite the record's file with the old copy removed and `record` appended.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record with that ID exists, or a storage error.
    fn replace<R: WorkItem>(&self, record: &R) -> Result<()>;

    /// Append one line to the project's event log.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn append_event(&self, project_id: &str, event: &Event) -> Result<()>;

    /// # Errors
    ///
    /// Returns a storage error if the log cannot be read or parsed.
    fn read_events(&self, project_id: &str) -> Result<Vec<Event>>;

    /// IDs of every project, sorted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the projects directory cannot be listed.
    fn project_ids(&self) -> Result<Vec<String>>;

    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project does not exist.
    fn read_project(&self, project_id: &str) -> Result<Project>;

    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn write_project(&self, project: &Project) -> Result<()>;

    /// The project's schema, or the default schema if none was written.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the schema exists but cannot be read.
    fn read_schema(&self, project_id: &str) -> Result<ProjectSchema>;

    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn write_schema(&self, project_id: &str, schema: &ProjectSchema) -> Result<()>;

    /// Remove a project and all of its files.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` or a storage error.
    fn delete_project(&self, project_id: &str) -> Result<()>;

    /// Fail early if the project's files cannot be written.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the project directory is not writable.
    fn check_writable(&self, project_id: &str) -> Result<()>;

    /// Look up one record by ID within a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent, or a storage error.
    fn read_one<R: WorkItem>(&self, project_id: &str, id: &str) -> Result<R> {
        self.read_all::<R>(project_id)?
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(|| WorkflowError::not_found(R::KIND, id))
    }

    /// # Errors
    ///
    /// Returns a storage error if the project directory cannot be inspected.
    fn project_exists(&self, project_id: &str) -> Result<bool> {
        match self.read_project(project_id) {
            Ok(_) => Ok(true),
            Err(WorkflowError::ProjectNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// File-system backed [`EntityStore`].
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root` (the workspace data directory).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(PROJECTS_DIR).join(project_id)
    }

    #[must_use]
    pub fn entity_path(&self, kind: EntityKind, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(kind.file_name())
    }

    #[must_use]
    pub fn events_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(EVENTS_FILE)
    }

    /// Create the `projects/` directory.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Io` if the directory cannot be created.
    pub fn init(&self) -> Result<()> {
        jsonl::probe_writable(&self.root.join(PROJECTS_DIR))
    }
}

impl EntityStore for FsStore {
    fn read_all<R: WorkItem>(&self, project_id: &str) -> Result<Vec<R>> {
        let path = self.entity_path(R::KIND, project_id);
        debug!(kind = %R::KIND, project = project_id, "Scanning entity file");
        jsonl::read_all(&path)
    }

    fn write_new<R: WorkItem>(&self, record: &R) -> Result<()> {
        let path = self.entity_path(R::KIND, record.project_id());
        jsonl::append(&path, record)
    }

    fn replace<R: WorkItem>(&self, record: &R) -> Result<()> {
        let path = self.entity_path(R::KIND, record.project_id());
        let mut records: Vec<R> = jsonl::read_all(&path)?;
        let before = records.len();
        records.retain(|existing| existing.id() != record.id());
        if records.len() == before {
            return Err(WorkflowError::not_found(R::KIND, record.id()));
        }
        records.push(record.clone());
        jsonl::rewrite(&path, &records)
    }

    fn append_event(&self, project_id: &str, event: &Event) -> Result<()> {
        jsonl::append(&self.events_path(project_id), event)
    }

    fn read_events(&self, project_id: &str) -> Result<Vec<Event>> {
        jsonl::read_all(&self.events_path(project_id))
    }

    fn project_ids(&self) -> Result<Vec<String>> {
        let dir = self.root.join(PROJECTS_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.path().join(PROJECT_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read_project(&self, project_id: &str) -> Result<Project> {
        let path = self.project_dir(project_id).join(PROJECT_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == IoErrorKind::NotFound => Err(WorkflowError::ProjectNotFound {
                id: project_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn write_project(&self, project: &Project) -> Result<()> {
        let path = self.project_dir(&project.id).join(PROJECT_FILE);
        let json = serde_json::to_string_pretty(project)?;
        jsonl::write_atomic(&path, json.as_bytes())
    }

    fn read_schema(&self, project_id: &str) -> Result<ProjectSchema> {
        let path = self.project_dir(project_id).join(SCHEMA_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(ProjectSchema::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_schema(&self, project_id: &str, schema: &ProjectSchema) -> Result<()> {
        let path = self.project_dir(project_id).join(SCHEMA_FILE);
        let json = serde_json::to_string_pretty(schema)?;
        jsonl::write_atomic(&path, json.as_bytes())
    }

    fn delete_project(&self, project_id: &str) -> Result<()> {
        if !self.project_exists(project_id)? {
            return Err(WorkflowError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }
        let dir = self.project_dir(project_id);
        fs::remove_dir_all(&dir).map_err(|err| {
            if err.kind() == IoErrorKind::PermissionDenied {
                WorkflowError::PermissionDenied { path: dir.clone() }
            } else {
                WorkflowError::Io(err)
            }
        })
    }

    fn check_writable(&self, project_id: &str) -> Result<()> {
        jsonl::probe_writable(&self.project_dir(project_id))
    }
}
