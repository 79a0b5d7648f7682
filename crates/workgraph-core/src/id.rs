//! Composite ID scheme.
//!
//! IDs are self-describing:
//!
//! - feature: `<project>-feature-<suffix>`
//! - task: `<project>-feature-<featureSuffix>-task-<suffix>`
//! - issue: `<project>-issue-<suffix>`
//!
//! Parsing locates the *last* kind marker so hyphenated project IDs are
//! tolerated, then strips backward to recover the owning project (and,
//! for tasks, the owning feature). This is the only way the engine finds
//! out which project's files a dependency ID lives in.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{Result, WorkflowError};
use crate::model::EntityKind;

/// Longest accepted project ID.
pub const MAX_PROJECT_ID_LEN: usize = 64;

/// Components recovered from a composite ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub kind: EntityKind,
    pub project_id: String,
    /// Owning feature (tasks only).
    pub feature_id: Option<String>,
    pub suffix: String,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a composite ID of any kind.
///
/// The kind is the one whose marker occurs last in the string.
///
/// # Errors
///
/// Returns `MalformedId` if no marker is present or a segment is empty.
pub fn parse(id: &str) -> Result<ParsedId> {
    let last_marker = EntityKind::ALL
        .iter()
        .filter_map(|kind| id.rfind(kind.marker()).map(|pos| (pos, *kind)))
        .max_by_key(|(pos, _)| *pos);

    let Some((pos, kind)) = last_marker else {
        return Err(malformed("record", id, "no kind marker (-feature-, -task-, -issue-)"));
    };

    let prefix = &id[..pos];
    let suffix = &id[pos + kind.marker().len()..];
    if suffix.is_empty() {
        return Err(malformed(kind, id, "empty suffix"));
    }
    if prefix.is_empty() {
        return Err(malformed(kind, id, "empty owner segment"));
    }

    match kind {
        EntityKind::Feature | EntityKind::Issue => Ok(ParsedId {
            kind,
            project_id: prefix.to_string(),
            feature_id: None,
            suffix: suffix.to_string(),
        }),
        EntityKind::Task => {
            let feature = parse(prefix)
                .ok()
                .filter(|parsed| parsed.kind == EntityKind::Feature)
                .ok_or_else(|| malformed(kind, id, "owner segment is not a feature ID"))?;
            Ok(ParsedId {
                kind,
                project_id: feature.project_id,
                feature_id: Some(prefix.to_string()),
                suffix: suffix.to_string(),
            })
        }
    }
}

/// Parse an ID that must be of the given kind.
///
/// # Errors
///
/// Returns `MalformedId` if the ID cannot be parsed or names another kind.
pub fn parse_as(kind: EntityKind, id: &str) -> Result<ParsedId> {
    let parsed = parse(id).map_err(|err| match err {
        WorkflowError::MalformedId { id, reason, .. } => WorkflowError::MalformedId {
            kind: kind.to_string(),
            id,
            reason,
        },
        other => other,
    })?;
    if parsed.kind != kind {
        return Err(malformed(
            kind,
            id,
            format!("is a {} ID", parsed.kind),
        ));
    }
    Ok(parsed)
}

/// Owning project of any composite ID.
///
/// # Errors
///
/// Returns `MalformedId` if the ID cannot be parsed.
pub fn project_of(id: &str) -> Result<String> {
    parse(id).map(|parsed| parsed.project_id)
}

/// Validate a user-chosen project ID.
///
/// # Errors
///
/// Returns a `Validation` error describing the first rule broken.
pub fn validate_project_id(id: &str) -> Result<()> {
    let fail = |reason: &str| Err(WorkflowError::validation("project_id", format!("'{id}' {reason}")));

    if id.is_empty() {
        return fail("is empty");
    }
    if id.len() > MAX_PROJECT_ID_LEN {
        return fail("is longer than 64 characters");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return fail("may only contain lowercase letters, digits and hyphens");
    }
    if id.starts_with('-') || id.ends_with('-') || id.contains("--") {
        return fail("must use single hyphens between segments");
    }
    if id
        .split('-')
        .any(|segment| EntityKind::ALL.iter().any(|kind| kind.as_str() == segment))
    {
        return fail("must not contain a kind marker (feature, task, issue segments)");
    }
    Ok(())
}

fn malformed(kind: impl ToString, id: &str, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::MalformedId {
        kind: kind.to_string(),
        id: id.to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Inputs hashed into a new suffix.
#[derive(Debug, Clone, Copy)]
pub struct IdSeed<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub actor: &'a str,
    pub created_at: DateTime<Utc>,
}

#[must_use]
pub fn feature_id(project_id: &str, suffix: &str) -> String {
    format!("{project_id}{}{suffix}", EntityKind::Feature.marker())
}

#[must_use]
pub fn task_id(feature_id: &str, suffix: &str) -> String {
    format!("{feature_id}{}{suffix}", EntityKind::Task.marker())
}

#[must_use]
pub fn issue_id(project_id: &str, suffix: &str) -> String {
    format!("{project_id}{}{suffix}", EntityKind::Issue.marker())
}

/// Generate a new ID of `kind` under `owner` (project ID, or feature ID for tasks).
///
/// Suffix length grows with `existing` so collision probability stays low;
/// `exists` is consulted and the nonce bumped on collision.
pub fn generate<F>(kind: EntityKind, seed: IdSeed<'_>, existing: usize, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let build = |suffix: &str| match kind {
        EntityKind::Feature => feature_id(seed.owner, suffix),
        EntityKind::Task => task_id(seed.owner, suffix),
        EntityKind::Issue => issue_id(seed.owner, suffix),
    };

    let mut length = optimal_suffix_length(existing);
    loop {
        for nonce in 0..10 {
            let id = build(&hash_suffix(&seed_string(seed, nonce), length));
            if !exists(&id) {
                return id;
            }
        }
        if length >= 12 {
            break;
        }
        length += 1;
    }

    let mut nonce = 10_u32;
    loop {
        let id = build(&format!("{}{nonce}", hash_suffix(&seed_string(seed, nonce), 12)));
        if !exists(&id) {
            return id;
        }
        nonce += 1;
    }
}

/// Smallest suffix length keeping the birthday-bound collision chance under 25%.
#[must_use]
fn optimal_suffix_length(existing: usize) -> usize {
    let n = existing as f64;
    for len in 4_i32..=8 {
        let space = 36_f64.powi(len);
        let prob = 1.0 - (-n * n / (2.0 * space)).exp();
        if prob < 0.25 {
            return usize::try_from(len).unwrap_or(8);
        }
    }
    8
}

fn seed_string(seed: IdSeed<'_>, nonce: u32) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        seed.owner,
        seed.name,
        seed.actor,
        seed.created_at.timestamp_nanos_opt().unwrap_or(0),
        nonce
    )
}

fn hash_suffix(input: &str, length: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut num = 0_u64;
    for &byte in digest.iter().take(8) {
        num = (num << 8) | u64::from(byte);
    }
    let encoded = base36(num);
    format!("{encoded:0>length$}").chars().take(length).collect()
}

fn base36(mut num: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if num == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while num > 0 {
        chars.push(char::from(ALPHABET[usize::try_from(num % 36).unwrap_or(0)]));
        num /= 36;
    }
    chars.into_iter().rev().collect()
}
