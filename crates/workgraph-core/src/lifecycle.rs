//! Per-kind capability descriptors for the workflow engine.
//!
//! [`Lifecycle`] describes a status enum: its transition table, which
//! statuses satisfy dependents, which statuses may not be depended on,
//! and which named actions apply. [`WorkItem`] ties a record type to its
//! status enum so validation, transitions and the cascade are written
//! once and instantiated per kind.
//!
//! Transition tables:
//!
//! | Kind | Transitions |
//! |---|---|
//! | Task | pending→{ready,in_progress,cancelled}; ready→{in_progress,cancelled}; in_progress→{done,blocked,cancelled}; blocked→{ready,cancelled} |
//! | Issue | open→{ready,in_progress,blocked,resolved,wontfix,cancelled}; ready→{in_progress,blocked,resolved,wontfix,cancelled}; in_progress→{blocked,resolved,wontfix,cancelled}; blocked→{ready,resolved,wontfix,cancelled} |
//! | Feature | draft→{active,blocked,done,cancelled}; active→{draft,blocked,done,cancelled}; blocked→{draft,active,cancelled} |
//!
//! A status with no outgoing transitions is terminal.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, WorkflowError};
use crate::model::{
    EntityKind, Feature, FeatureStatus, Issue, IssueStatus, ItemBase, Task, TaskStatus,
};

/// Named status actions that bypass or extend the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Cancel,
    Reopen,
    Start,
    Resolve,
    Wontfix,
}

impl Action {
    pub const ALL: [Self; 5] = [
        Self::Cancel,
        Self::Reopen,
        Self::Start,
        Self::Resolve,
        Self::Wontfix,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Reopen => "reopen",
            Self::Start => "start",
            Self::Resolve => "resolve",
            Self::Wontfix => "wontfix",
        }
    }

    /// Actions that must carry a non-empty reason.
    #[must_use]
    pub const fn requires_reason(self) -> bool {
        matches!(self, Self::Cancel | Self::Wontfix)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| {
                WorkflowError::validation(
                    "action",
                    format!("invalid value '{s}' (expected cancel, reopen, start, resolve or wontfix)"),
                )
            })
    }
}

/// Why a named action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The kind has no such action.
    Unsupported,
    /// The action exists but not from the current status.
    NotFrom(String),
}

/// Status enum capabilities.
pub trait Lifecycle:
    'static + Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr<Err = WorkflowError> + Serialize + DeserializeOwned
{
    /// Every member, in declaration order.
    fn members() -> &'static [Self];

    /// Allowed plain-status successors. Empty means terminal.
    fn next_states(self) -> &'static [Self];

    /// Counts as "done" for dependents.
    fn is_satisfying(self) -> bool;

    /// May not be added as a new dependency target.
    fn rejects_as_dependency(self) -> bool;

    /// Status of a new record with no dependencies.
    fn initial() -> Self;

    /// Status once every dependency is satisfied.
    fn unblocked() -> Self;

    fn blocked() -> Self;

    fn cancelled() -> Self;

    /// Target of `reopen`, if this status can be reopened.
    fn reopen_target(self) -> Option<Self>;

    /// Field edits are refused in this status.
    fn is_locked(self) -> bool {
        self == Self::cancelled()
    }

    fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.next_states().contains(&next)
    }

    /// `cancel` refuses while active dependents exist (unless forced).
    fn guards_dependents_on_cancel() -> bool {
        true
    }

    /// Ready-equivalent statuses the engine may re-derive from dependencies.
    fn is_derivable(self) -> bool {
        self == Self::initial() || self == Self::unblocked() || self == Self::blocked()
    }

    /// Target of `start` from this status; `Err(Unsupported)` if the kind has no `start`.
    fn start_target(self) -> std::result::Result<Self, Refusal> {
        Err(Refusal::Unsupported)
    }

    /// Target of `resolve`; `None` if the kind has no `resolve`.
    fn resolved() -> Option<Self> {
        None
    }

    /// Target of `wontfix`; `None` if the kind has no `wontfix`.
    fn wontfix() -> Option<Self> {
        None
    }

    /// Plain status requests that must go through a named action's guards.
    fn promoted_action(self) -> Option<Action> {
        if self == Self::cancelled() {
            Some(Action::Cancel)
        } else if Self::wontfix() == Some(self) {
            Some(Action::Wontfix)
        } else {
            None
        }
    }

    /// Resolve a named action from the current status.
    ///
    /// # Errors
    ///
    /// Returns a [`Refusal`] if the kind lacks the action or the current
    /// status does not permit it.
    fn apply_action(self, action: Action) -> std::result::Result<Self, Refusal> {
        let from_non_terminal = |target: Option<Self>| match target {
            None => Err(Refusal::Unsupported),
            Some(_) if self.is_terminal() => Err(Refusal::NotFrom(format!(
                "status {self} is terminal"
            ))),
            Some(target) => Ok(target),
        };

        match action {
            Action::Cancel => from_non_terminal(Some(Self::cancelled())),
            Action::Resolve => from_non_terminal(Self::resolved()),
            Action::Wontfix => from_non_terminal(Self::wontfix()),
            Action::Start => self.start_target(),
            Action::Reopen => self.reopen_target().ok_or_else(|| {
                let reopenable: Vec<String> = Self::members()
                    .iter()
                    .filter(|status| status.reopen_target().is_some())
                    .map(ToString::to_string)
                    .collect();
                Refusal::NotFrom(format!(
                    "only {} records can be reopened (status is {self})",
                    reopenable.join("/")
                ))
            }),
        }
    }
}

impl Lifecycle for TaskStatus {
    fn members() -> &'static [Self] {
        Self::ALL
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Ready, Self::InProgress, Self::Cancelled],
            Self::Ready => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Done, Self::Blocked, Self::Cancelled],
            Self::Blocked => &[Self::Ready, Self::Cancelled],
            Self::Done | Self::Cancelled => &[],
        }
    }

    fn is_satisfying(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    fn rejects_as_dependency(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    fn initial() -> Self {
        Self::Ready
    }

    fn unblocked() -> Self {
        Self::Ready
    }

    fn blocked() -> Self {
        Self::Blocked
    }

    fn cancelled() -> Self {
        Self::Cancelled
    }

    fn reopen_target(self) -> Option<Self> {
        (self == Self::Cancelled).then_some(Self::Pending)
    }

    fn is_locked(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl Lifecycle for FeatureStatus {
    fn members() -> &'static [Self] {
        Self::ALL
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Active, Self::Blocked, Self::Done, Self::Cancelled],
            Self::Active => &[Self::Draft, Self::Blocked, Self::Done, Self::Cancelled],
            Self::Blocked => &[Self::Draft, Self::Active, Self::Cancelled],
            Self::Done | Self::Cancelled => &[],
        }
    }

    fn is_satisfying(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    fn rejects_as_dependency(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    fn initial() -> Self {
        Self::Draft
    }

    fn unblocked() -> Self {
        Self::Draft
    }

    fn blocked() -> Self {
        Self::Blocked
    }

    fn cancelled() -> Self {
        Self::Cancelled
    }

    fn reopen_target(self) -> Option<Self> {
        (self == Self::Cancelled).then_some(Self::Draft)
    }
}

impl Lifecycle for IssueStatus {
    fn members() -> &'static [Self] {
        Self::ALL
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Open => &[
                Self::Ready,
                Self::InProgress,
                Self::Blocked,
                Self::Resolved,
                Self::Wontfix,
                Self::Cancelled,
            ],
            Self::Ready => &[
                Self::InProgress,
                Self::Blocked,
                Self::Resolved,
                Self::Wontfix,
                Self::Cancelled,
            ],
            Self::InProgress => &[Self::Blocked, Self::Resolved, Self::Wontfix, Self::Cancelled],
            Self::Blocked => &[Self::Ready, Self::Resolved, Self::Wontfix, Self::Cancelled],
            Self::Resolved | Self::Wontfix | Self::Cancelled => &[],
        }
    }

    // A cancelled issue never satisfies its dependents.
    fn is_satisfying(self) -> bool {
        matches!(self, Self::Resolved | Self::Wontfix)
    }

    fn rejects_as_dependency(self) -> bool {
        self == Self::Cancelled
    }

    fn initial() -> Self {
        Self::Open
    }

    fn unblocked() -> Self {
        Self::Ready
    }

    fn blocked() -> Self {
        Self::Blocked
    }

    fn cancelled() -> Self {
        Self::Cancelled
    }

    fn reopen_target(self) -> Option<Self> {
        matches!(self, Self::Resolved | Self::Wontfix | Self::Cancelled).then_some(Self::Open)
    }

    fn guards_dependents_on_cancel() -> bool {
        false
    }

    fn start_target(self) -> std::result::Result<Self, Refusal> {
        match self {
            Self::Open | Self::Ready => Ok(Self::InProgress),
            other => Err(Refusal::NotFrom(format!(
                "only open or ready issues can be started (status is {other})"
            ))),
        }
    }

    fn resolved() -> Option<Self> {
        Some(Self::Resolved)
    }

    fn wontfix() -> Option<Self> {
        Some(Self::Wontfix)
    }
}

/// A record type driven by the workflow engine.
pub trait WorkItem: Clone + fmt::Debug + Serialize + DeserializeOwned {
    type Status: Lifecycle;

    const KIND: EntityKind;

    fn base(&self) -> &ItemBase;

    fn base_mut(&mut self) -> &mut ItemBase;

    fn status(&self) -> Self::Status;

    fn set_status(&mut self, status: Self::Status);

    fn id(&self) -> &str {
        &self.base().id
    }

    fn project_id(&self) -> &str {
        &self.base().project_id
    }

    fn depends_on(&self) -> &[String] {
        &self.base().depends_on
    }
}

impl WorkItem for Feature {
    type Status = FeatureStatus;

    const KIND: EntityKind = EntityKind::Feature;

    fn base(&self) -> &ItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }

    fn status(&self) -> FeatureStatus {
        self.status
    }

    fn set_status(&mut self, status: FeatureStatus) {
        self.status = status;
    }
}

impl WorkItem for Task {
    type Status = TaskStatus;

    const KIND: EntityKind = EntityKind::Task;

    fn base(&self) -> &ItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }
}

impl WorkItem for Issue {
    type Status = IssueStatus;

    const KIND: EntityKind = EntityKind::Issue;

    fn base(&self) -> &ItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ItemBase {
        &mut self.base
    }

    fn status(&self) -> IssueStatus {
        self.status
    }

    fn set_status(&mut self, status: IssueStatus) {
        self.status = status;
    }
}

/// Check a plain status request against the kind's transition table.
///
/// # Errors
///
/// Returns `IllegalTransition` naming the pair if `to` is not reachable from `from`.
pub fn check_transition<S: Lifecycle>(kind: EntityKind, from: S, to: S) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition {
            kind: kind.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
