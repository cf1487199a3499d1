//! Intermediate form produced by [`parse`](crate::parser::parse).
//!
//! Every section is `Option`: `None` means the section was missing from the
//! document (a warning was emitted), which is different from an empty list.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskpanel_core::{EvrClass, EvrId, EvrStatus, LogEntry, NodeId, PlanStatus, RecordId, VersionTag};

/// Values carried by the document's header comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelMeta {
    pub record: Option<RecordId>,
    pub version: Option<VersionTag>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A plan or step line plus its detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelNode {
    pub id: NodeId,
    pub description: String,
    pub status: PlanStatus,
    pub hints: Vec<String>,
    pub tags: Vec<String>,
    pub evidence: Option<String>,
    pub notes: Option<String>,
    /// Only populated for steps.
    pub evr_refs: Vec<EvrId>,
    /// 1-based line of the checklist item.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelPlan {
    pub node: PanelNode,
    pub steps: Vec<PanelNode>,
}

/// One row of the expected-results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelEvr {
    pub id: EvrId,
    pub title: String,
    pub verify: Vec<String>,
    pub expect: Vec<String>,
    pub status: EvrStatus,
    pub class: EvrClass,
    pub last_run: Option<DateTime<Utc>>,
    pub proof: Option<String>,
    pub line: usize,
}

/// Parsed panel document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelData {
    pub meta: PanelMeta,
    pub title: Option<String>,
    pub goal: Option<String>,
    pub references: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub issues: Option<Vec<String>>,
    pub hints: Option<Vec<String>>,
    pub plans: Option<Vec<PanelPlan>>,
    pub evrs: Option<Vec<PanelEvr>>,
    pub logs: Option<Vec<LogEntry>>,
    pub warnings: Vec<ParseWarning>,
}

impl PanelData {
    /// Plan or step with `id`, searching steps too.
    pub fn node(&self, id: &NodeId) -> Option<&PanelNode> {
        self.plans.as_ref()?.iter().find_map(|plan| {
            if &plan.node.id == id {
                Some(&plan.node)
            } else {
                plan.steps.iter().find(|s| &s.id == id)
            }
        })
    }

    pub fn evr(&self, id: &EvrId) -> Option<&PanelEvr> {
        self.evrs.as_ref()?.iter().find(|e| &e.id == id)
    }
}

/// Category of a recoverable document problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingMeta,
    MissingSection,
    UnknownSection,
    DuplicateSection,
    MalformedMarker,
    MissingAnchor,
    DuplicateAnchor,
    /// Anchor parsed fine but names no node of the record.
    UnresolvedAnchor,
    OrphanedLine,
    UnknownDetail,
    BadTableRow,
    BadCell,
    BadLogEntry,
    /// A cell only the record API may change was edited; the record keeps its value.
    ReadOnlyCell,
    UnrecognizedLine,
}

/// A document line or section that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    /// 1-based line number, when the problem is tied to one line.
    pub line: Option<usize>,
    pub message: String,
}

impl ParseWarning {
    pub fn at(kind: WarningKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn general(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
