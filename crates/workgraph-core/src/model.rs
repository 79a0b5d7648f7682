//! Core data types for workgraph-core.
//!
//! Every record is stored as one JSON object per line; the common
//! [`ItemBase`] fields are flattened into each kind's record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkflowError;

/// Actor recorded on mutations the engine performs on its own.
pub const SYSTEM_ACTOR: &str = "system";

/// Generates `as_str`, `ALL`, `Display` and `FromStr` for a plain wire enum.
macro_rules! wire_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every member, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = WorkflowError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = Self::ALL.iter().map(Self::as_str).collect();
                        WorkflowError::validation(
                            $field,
                            format!("invalid value '{s}' (expected one of: {})", allowed.join(", ")),
                        )
                    })
            }
        }
    };
}

// ============================================================================
// Kinds and enums
// ============================================================================

/// The three entity kinds driven by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Feature,
    Task,
    Issue,
}

wire_enum!(EntityKind, "kind", {
    Feature => "feature",
    Task => "task",
    Issue => "issue",
});

impl EntityKind {
    /// Marker embedded in composite IDs (`-feature-`, `-task-`, `-issue-`).
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Feature => "-feature-",
            Self::Task => "-task-",
            Self::Issue => "-issue-",
        }
    }

    /// Per-project entity file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Feature => "features.jsonl",
            Self::Task => "tasks.jsonl",
            Self::Issue => "issues.jsonl",
        }
    }
}

/// Priority (P0 = most urgent, P5 = least).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const P0: Self = Self(0);
    pub const P1: Self = Self(1);
    pub const P2: Self = Self(2);
    pub const P3: Self = Self(3);
    pub const P4: Self = Self(4);
    pub const P5: Self = Self(5);

    pub const ALL: [Self; 6] = [Self::P0, Self::P1, Self::P2, Self::P3, Self::P4, Self::P5];
}

impl Default for Priority {
    fn default() -> Self {
        Self::P2
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let digits = upper.strip_prefix('P').unwrap_or(&upper);

        match digits.parse::<u8>() {
            Ok(p) if p <= Self::P5.0 => Ok(Self(p)),
            _ => Err(WorkflowError::validation(
                "priority",
                format!("invalid value '{s}' (expected P0-P5)"),
            )),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Technical scope of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "frontend")]
    Frontend,
    #[serde(rename = "backend")]
    Backend,
    #[serde(rename = "fullstack")]
    Fullstack,
    #[serde(rename = "cli")]
    Cli,
    #[serde(rename = "desktop")]
    Desktop,
    #[serde(rename = "android")]
    Android,
    #[serde(rename = "flutter")]
    Flutter,
    #[serde(rename = "react-native")]
    ReactNative,
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "swift")]
    Swift,
    #[default]
    #[serde(rename = "")]
    Empty,
}

wire_enum!(Scope, "scope", {
    Frontend => "frontend",
    Backend => "backend",
    Fullstack => "fullstack",
    Cli => "cli",
    Desktop => "desktop",
    Android => "android",
    Flutter => "flutter",
    ReactNative => "react-native",
    Ios => "ios",
    Swift => "swift",
    Empty => "",
});

/// Category of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    #[default]
    Bug,
    Improvement,
    Debt,
    Security,
    Performance,
}

wire_enum!(IssueType, "issue_type", {
    Bug => "bug",
    Improvement => "improvement",
    Debt => "debt",
    Security => "security",
    Performance => "performance",
});

/// Per-project, per-kind policy for cross-project dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyRule {
    #[default]
    SameProjectOnly,
    CrossProjectAllowed,
    Disabled,
}

wire_enum!(DependencyRule, "dependency_rule", {
    SameProjectOnly => "same_project_only",
    CrossProjectAllowed => "cross_project_allowed",
    Disabled => "disabled",
});

impl DependencyRule {
    #[must_use]
    pub const fn allows_cross_project(self) -> bool {
        matches!(self, Self::CrossProjectAllowed)
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Feature lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Draft,
    Active,
    Done,
    Blocked,
    Cancelled,
}

wire_enum!(FeatureStatus, "status", {
    Draft => "draft",
    Active => "active",
    Done => "done",
    Blocked => "blocked",
    Cancelled => "cancelled",
});

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    InProgress,
    Blocked,
    Done,
    Cancelled,
}

wire_enum!(TaskStatus, "status", {
    Pending => "pending",
    Ready => "ready",
    InProgress => "in_progress",
    Blocked => "blocked",
    Done => "done",
    Cancelled => "cancelled",
});

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Ready,
    InProgress,
    Blocked,
    Resolved,
    Wontfix,
    Cancelled,
}

wire_enum!(IssueStatus, "status", {
    Open => "open",
    Ready => "ready",
    InProgress => "in_progress",
    Blocked => "blocked",
    Resolved => "resolved",
    Wontfix => "wontfix",
    Cancelled => "cancelled",
});

// ============================================================================
// Records
// ============================================================================

/// Fields shared by every work item kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBase {
    /// Composite ID (see [`crate::id`]).
    pub id: String,

    /// Owning project.
    pub project_id: String,

    pub name: String,

    pub goal: String,

    #[serde(default)]
    pub priority: Priority,

    /// IDs of same-kind records this one waits on. Order is preserved.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Set only by cancel / wontfix; cleared on reopen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub updated_by: String,
}

impl ItemBase {
    /// Fresh base for a record about to be created.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        goal: impl Into<String>,
        actor: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            project_id: project_id.into(),
            name: name.into(),
            goal: goal.into(),
            priority: Priority::default(),
            depends_on: Vec::new(),
            reason: None,
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
        }
    }

    /// Stamp an update.
    pub fn touch(&mut self, actor: &str) {
        self.updated_at = Utc::now();
        actor.clone_into(&mut self.updated_by);
    }
}

/// A feature: a unit of product scope inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(flatten)]
    pub base: ItemBase,

    pub status: FeatureStatus,

    #[serde(default)]
    pub scope: Scope,
}

/// A task: an implementable step belonging to one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub base: ItemBase,

    /// Parent feature ID.
    pub feature_id: String,

    pub status: TaskStatus,

    #[serde(default)]
    pub implementation_steps: Vec<String>,

    #[serde(default)]
    pub test_cases: Vec<String>,

    #[serde(default)]
    pub derivable_files: Vec<String>,

    #[serde(default)]
    pub library_needs: Vec<String>,
}

/// An issue: a project-scoped defect or improvement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(flatten)]
    pub base: ItemBase,

    pub status: IssueStatus,

    #[serde(default)]
    pub issue_type: IssueType,

    #[serde(default)]
    pub affected_files: Vec<String>,

    #[serde(default)]
    pub affected_tests: Vec<String>,

    #[serde(default)]
    pub implementation_steps: Vec<String>,

    #[serde(default)]
    pub library_needs: Vec<String>,
}

// ============================================================================
// Projects
// ============================================================================

/// A project: the owner of one set of entity files and a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub created_by: String,
}

/// Per-kind rules in a project schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRules {
    #[serde(default)]
    pub dependency: DependencyRule,

    /// Kept for file-format compatibility; cycles are always rejected.
    #[serde(default = "default_cycle_rule")]
    pub cycle: String,
}

fn default_cycle_rule() -> String {
    "forbid".to_string()
}

impl Default for KindRules {
    fn default() -> Self {
        Self {
            dependency: DependencyRule::default(),
            cycle: default_cycle_rule(),
        }
    }
}

/// Allowed priority levels and the default applied on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRules {
    pub levels: Vec<Priority>,
    pub default: Priority,
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self {
            levels: Priority::ALL.to_vec(),
            default: Priority::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRules {
    #[serde(default)]
    pub task: KindRules,
    #[serde(default)]
    pub feature: KindRules,
    #[serde(default)]
    pub issue: KindRules,
    #[serde(default)]
    pub priority: PriorityRules,
}

/// Project schema file (`schema.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSchema {
    pub version: u32,
    #[serde(default)]
    pub rules: SchemaRules,
}

impl Default for ProjectSchema {
    fn default() -> Self {
        Self {
            version: 1,
            rules: SchemaRules::default(),
        }
    }
}

impl ProjectSchema {
    /// Dependency rule for the given kind.
    #[must_use]
    pub const fn dependency_rule(&self, kind: EntityKind) -> DependencyRule {
        match kind {
            EntityKind::Feature => self.rules.feature.dependency,
            EntityKind::Task => self.rules.task.dependency,
            EntityKind::Issue => self.rules.issue.dependency,
        }
    }

    pub fn set_dependency_rule(&mut self, kind: EntityKind, rule: DependencyRule) {
        let rules = match kind {
            EntityKind::Feature => &mut self.rules.feature,
            EntityKind::Task => &mut self.rules.task,
            EntityKind::Issue => &mut self.rules.issue,
        };
        rules.dependency = rule;
    }
}

// ============================================================================
// Events
// ============================================================================

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    Ready,
    Blocked,
    Deleted,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Ready => "ready",
            Self::Blocked => "blocked",
            Self::Deleted => "deleted",
            Self::Custom(value) => value,
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        let event_type = match value.as_str() {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "ready" => Self::Ready,
            "blocked" => Self::Blocked,
            "deleted" => Self::Deleted,
            _ => Self::Custom(value),
        };
        Ok(event_type)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a project's `events.jsonl`. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Which layer produced the event (`project`, `feature`, `task`, `issue`).
    pub layer: String,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Subject record ID.
    pub id: String,

    /// Actor, or [`SYSTEM_ACTOR`].
    pub by: String,

    pub ts: DateTime<Utc>,

    /// Changed field names (updates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<String>>,
}

impl Event {
    #[must_use]
    pub fn new(
        layer: impl Into<String>,
        event_type: EventType,
        id: impl Into<String>,
        by: impl Into<String>,
    ) -> Self {
        Self {
            layer: layer.into(),
            event_type,
            id: id.into(),
            by: by.into(),
            ts: Utc::now(),
            changes: None,
        }
    }

    #[must_use]
    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = Some(changes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_with_and_without_prefix() {
        assert_eq!("P3".parse::<Priority>().unwrap(), Priority::P3);
        assert_eq!("p0".parse::<Priority>().unwrap(), Priority::P0);
        assert_eq!("5".parse::<Priority>().unwrap(), Priority::P5);
        assert!("P6".parse::<Priority>().is_err());
        assert!("high".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_serializes_as_string() {
        let json = serde_json::to_string(&Priority::P1).unwrap();
        assert_eq!(json, "\"P1\"");
        let back: Priority = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Priority::P1);
    }

    #[test]
    fn scope_wire_names() {
        assert_eq!(serde_json::to_string(&Scope::ReactNative).unwrap(), "\"react-native\"");
        assert_eq!(serde_json::to_string(&Scope::Empty).unwrap(), "\"\"");
        assert_eq!("React-Native".parse::<Scope>().unwrap(), Scope::ReactNative);
        assert_eq!("".parse::<Scope>().unwrap(), Scope::Empty);
    }

    #[test]
    fn status_from_str_rejects_unknown() {
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        let err = "finished".parse::<TaskStatus>().unwrap_err();
        assert!(err.to_string().contains("finished"));
    }

    #[test]
    fn task_record_flattens_base_fields() {
        let task = Task {
            base: ItemBase::new("acme", "Wire login", "Users can log in", "alice"),
            feature_id: "acme-feature-abc".to_string(),
            status: TaskStatus::Ready,
            implementation_steps: vec!["step".into()],
            test_cases: vec!["case".into()],
            derivable_files: vec!["src/login.rs".into()],
            library_needs: vec!["none".into()],
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["project_id"], "acme");
        assert_eq!(value["status"], "ready");
        assert_eq!(value["priority"], "P2");
        assert!(value.get("reason").is_none());

        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn schema_defaults_fill_missing_sections() {
        let schema: ProjectSchema =
            serde_json::from_str(r#"{"version":1,"rules":{"task":{"dependency":"cross_project_allowed"}}}"#)
                .unwrap();
        assert_eq!(
            schema.dependency_rule(EntityKind::Task),
            DependencyRule::CrossProjectAllowed
        );
        assert_eq!(
            schema.dependency_rule(EntityKind::Issue),
            DependencyRule::SameProjectOnly
        );
        assert_eq!(schema.rules.priority.default, Priority::P2);
        assert_eq!(schema.rules.task.cycle, "forbid");
    }

    #[test]
    fn event_type_roundtrips_custom_values() {
        let event = Event::new("task", EventType::Custom("archived".into()), "x", "bob");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"archived""#));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type, EventType::Custom("archived".into()));
    }
}
