//! Classified differences between a record and its panel document.

use std::fmt;

use serde::Serialize;

use taskpanel_core::{Field, LogEntry, NodeId, PlanStatus, SectionKey};
use taskpanel_renderer::ParseWarning;

/// Canonical value of one field, as compared and applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Logs(Vec<LogEntry>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{text:?}"),
            FieldValue::List(items) => write!(f, "{items:?}"),
            FieldValue::Logs(entries) => write!(f, "[{} log entries]", entries.len()),
        }
    }
}

/// A content field the document changed and the record did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentChange {
    pub section: SectionKey,
    pub field: Field,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// A checklist marker that differs from the record's status.
///
/// Never applied by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub node: NodeId,
    pub old_status: PlanStatus,
    pub new_status: PlanStatus,
}

/// A field both sides changed to different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConflict {
    pub section: SectionKey,
    pub field: Field,
    /// Record value.
    pub ours: FieldValue,
    /// Document value.
    pub theirs: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Content(ContentChange),
    Status(StatusChange),
    Conflict(FieldConflict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// The record.
    Ours,
    /// The document.
    Theirs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Record and document carry different version tags.
    EtagMismatch,
    /// Decided by comparing modification times.
    StaleTimestamp,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::EtagMismatch => f.write_str("etag_mismatch"),
            ConflictReason::StaleTimestamp => f.write_str("stale_timestamp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConflict {
    pub section: SectionKey,
    pub field: Field,
    pub ours: FieldValue,
    pub theirs: FieldValue,
    pub winner: Winner,
    pub reason: ConflictReason,
}

impl ResolvedConflict {
    /// Value that ends up in the record.
    pub fn winning_value(&self) -> &FieldValue {
        match self.winner {
            Winner::Ours => &self.ours,
            Winner::Theirs => &self.theirs,
        }
    }
}

/// Output of the change detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub changes: Vec<Change>,
    pub warnings: Vec<ParseWarning>,
}

impl Detection {
    /// Conflict candidates, in detection order.
    pub fn conflicts(&self) -> impl Iterator<Item = &FieldConflict> {
        self.changes.iter().filter_map(|c| match c {
            Change::Conflict(conflict) => Some(conflict),
            _ => None,
        })
    }
}

/// Result of a dry run or an apply.
///
/// `changes` holds content and status changes only; conflict candidates
/// appear resolved in `conflicts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPreview {
    pub applied: bool,
    pub changes: Vec<Change>,
    pub conflicts: Vec<ResolvedConflict>,
    pub warnings: Vec<ParseWarning>,
}

impl SyncPreview {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty() && self.conflicts.is_empty() && self.warnings.is_empty()
    }

    pub fn content_changes(&self) -> impl Iterator<Item = &ContentChange> {
        self.changes.iter().filter_map(|c| match c {
            Change::Content(change) => Some(change),
            _ => None,
        })
    }

    pub fn status_changes(&self) -> impl Iterator<Item = &StatusChange> {
        self.changes.iter().filter_map(|c| match c {
            Change::Status(change) => Some(change),
            _ => None,
        })
    }
}
