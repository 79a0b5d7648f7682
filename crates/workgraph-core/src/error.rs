//! Error types for `workgraph-core`.
//!
//! Every failure maps onto one of three kinds, which in turn map 1:1
//! onto process exit codes:
//! - Validation (2): bad input, rule violations, illegal transitions
//! - System (1): storage I/O and (de)serialization failures
//! - Permission (3): a write path is not writable

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes surfaced by the CLI layer.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const SYSTEM_ERROR: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 2;
    pub const PERMISSION_ERROR: i32 = 3;
}

/// Coarse classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    System,
    Permission,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::System => "system",
            Self::Permission => "permission",
        }
    }
}

/// Primary error type for workflow operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    // === Lookup Errors ===
    /// Record with the specified ID was not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Project with the specified ID was not found.
    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    /// Attempted to create a project that already exists.
    #[error("Project already exists: {id}")]
    ProjectExists { id: String },

    /// ID does not follow the composite ID scheme.
    #[error("Malformed {kind} ID '{id}': {reason}")]
    MalformedId {
        kind: String,
        id: String,
        reason: String,
    },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {}", join_errors(.errors))]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Requested status change is not in the kind's transition table.
    #[error("Illegal {kind} status transition: {from} -> {to}")]
    IllegalTransition {
        kind: String,
        from: String,
        to: String,
    },

    /// Named action cannot be applied to this kind or in this status.
    #[error("Cannot {action} {kind} {id}: {reason}")]
    ActionRejected {
        action: String,
        kind: String,
        id: String,
        reason: String,
    },

    /// Record is in a state that forbids edits.
    #[error("{kind} {id} is {status} and cannot be modified")]
    Locked {
        kind: String,
        id: String,
        status: String,
    },

    // === Dependency Errors ===
    /// Record lists itself as a dependency.
    #[error("{kind} cannot depend on itself: {id}")]
    SelfDependency { kind: String, id: String },

    /// Adding the dependency would close a cycle.
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// Dependency target exists but is in a status that cannot be depended on.
    #[error("Cannot depend on {kind} {id}: it is {status}")]
    UnusableDependency {
        kind: String,
        id: String,
        status: String,
    },

    /// Cross-project edge forbidden by the project's dependency rule.
    #[error(
        "Cross-project {kind} dependency {id} (project '{target_project}') not allowed: rule is {rule}"
    )]
    DependencyRuleViolation {
        kind: String,
        id: String,
        target_project: String,
        rule: String,
    },

    /// Cannot cancel a record that others still depend on.
    #[error("Cannot cancel {id}: {count} active dependents ({}); use force to override", .dependents.join(", "))]
    HasDependents {
        id: String,
        count: usize,
        dependents: Vec<String>,
    },

    // === Storage Errors ===
    /// Failed to parse a line in a JSONL file.
    #[error("JSONL parse error in {} at line {line}: {reason}", .path.display())]
    JsonlParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Write path is not writable.
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkflowError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn not_found(kind: impl ToString, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = errors.remove(0);
            Self::Validation {
                field: err.field,
                reason: err.message,
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. }
            | Self::ProjectNotFound { .. }
            | Self::ProjectExists { .. }
            | Self::MalformedId { .. }
            | Self::Validation { .. }
            | Self::ValidationErrors { .. }
            | Self::IllegalTransition { .. }
            | Self::ActionRejected { .. }
            | Self::Locked { .. }
            | Self::SelfDependency { .. }
            | Self::CircularDependency { .. }
            | Self::UnusableDependency { .. }
            | Self::DependencyRuleViolation { .. }
            | Self::HasDependents { .. } => ErrorKind::Validation,
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::Io(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorKind::Permission
            }
            Self::JsonlParse { .. } | Self::Io(_) | Self::Json(_) => ErrorKind::System,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => exit_codes::VALIDATION_ERROR,
            ErrorKind::System => exit_codes::SYSTEM_ERROR,
            ErrorKind::Permission => exit_codes::PERMISSION_ERROR,
        }
    }
}

/// Result type using `WorkflowError`.
pub type Result<T> = std::result::Result<T, WorkflowError>;
