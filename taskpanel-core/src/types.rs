//! Domain types for the structured task record.
//!
//! All types are serializable/deserializable via serde + serde_yaml. The
//! record is the authoritative side; the rendered panel is derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(
    /// Identifier of a task record (also names its YAML file).
    RecordId
);
string_newtype!(
    /// Identifier of a plan (`P1`) or step (`P1.S2`). Used as the panel anchor.
    NodeId
);
string_newtype!(
    /// Identifier of an expected result (`E1`).
    EvrId
);
string_newtype!(
    /// Opaque optimistic-concurrency token, replaced on every structured mutation.
    VersionTag
);

impl VersionTag {
    /// A fresh, random tag.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl NodeId {
    /// `true` for step ids (`P1.S2`), `false` for plan ids.
    pub fn is_step(&self) -> bool {
        self.0.contains('.')
    }

    /// Plan id owning this step, or `None` for plan ids.
    pub fn parent(&self) -> Option<NodeId> {
        self.0
            .split_once('.')
            .map(|(plan, _)| NodeId::from(plan))
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Execution status of a plan or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    ToDo,
    InProgress,
    Completed,
    Blocked,
}

impl PlanStatus {
    pub fn all() -> &'static [PlanStatus] {
        &[
            PlanStatus::ToDo,
            PlanStatus::InProgress,
            PlanStatus::Completed,
            PlanStatus::Blocked,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::ToDo => "to_do",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
            PlanStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "to_do" | "todo" => Ok(PlanStatus::ToDo),
            "in_progress" => Ok(PlanStatus::InProgress),
            "completed" | "done" => Ok(PlanStatus::Completed),
            "blocked" => Ok(PlanStatus::Blocked),
            other => Err(format!(
                "unknown status '{other}'; expected: to_do, in_progress, completed, blocked"
            )),
        }
    }
}

/// Verification state of an expected result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvrStatus {
    #[default]
    Unknown,
    Passing,
    Failing,
}

impl fmt::Display for EvrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvrStatus::Unknown => write!(f, "unknown"),
            EvrStatus::Passing => write!(f, "passing"),
            EvrStatus::Failing => write!(f, "failing"),
        }
    }
}

impl FromStr for EvrStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(EvrStatus::Unknown),
            "passing" | "pass" => Ok(EvrStatus::Passing),
            "failing" | "fail" => Ok(EvrStatus::Failing),
            other => Err(format!(
                "unknown EVR status '{other}'; expected: unknown, passing, failing"
            )),
        }
    }
}

/// Whether an expected result is checked statically or by running something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvrClass {
    #[default]
    Static,
    Runtime,
}

impl fmt::Display for EvrClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvrClass::Static => write!(f, "static"),
            EvrClass::Runtime => write!(f, "runtime"),
        }
    }
}

impl FromStr for EvrClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(EvrClass::Static),
            "runtime" => Ok(EvrClass::Runtime),
            other => Err(format!("unknown EVR class '{other}'; expected: static, runtime")),
        }
    }
}

// ---------------------------------------------------------------------------
// Section identity
// ---------------------------------------------------------------------------

/// One independently fingerprinted section of a record.
///
/// String form: `title`, `goal`, `references`, `requirements`, `issues`,
/// `hints`, `plan:<id>`, `step:<id>`, `evr:<id>`, `logs`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SectionKey {
    Title,
    Goal,
    References,
    Requirements,
    Issues,
    Hints,
    Plan(NodeId),
    Step(NodeId),
    Evr(EvrId),
    Logs,
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKey::Title => write!(f, "title"),
            SectionKey::Goal => write!(f, "goal"),
            SectionKey::References => write!(f, "references"),
            SectionKey::Requirements => write!(f, "requirements"),
            SectionKey::Issues => write!(f, "issues"),
            SectionKey::Hints => write!(f, "hints"),
            SectionKey::Plan(id) => write!(f, "plan:{id}"),
            SectionKey::Step(id) => write!(f, "step:{id}"),
            SectionKey::Evr(id) => write!(f, "evr:{id}"),
            SectionKey::Logs => write!(f, "logs"),
        }
    }
}

impl FromStr for SectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((kind, id)) = s.split_once(':') {
            if id.is_empty() {
                return Err(format!("section key '{s}' has an empty id"));
            }
            return match kind {
                "plan" => Ok(SectionKey::Plan(NodeId::from(id))),
                "step" => Ok(SectionKey::Step(NodeId::from(id))),
                "evr" => Ok(SectionKey::Evr(EvrId::from(id))),
                other => Err(format!("unknown section kind '{other}'")),
            };
        }
        match s {
            "title" => Ok(SectionKey::Title),
            "goal" => Ok(SectionKey::Goal),
            "references" => Ok(SectionKey::References),
            "requirements" => Ok(SectionKey::Requirements),
            "issues" => Ok(SectionKey::Issues),
            "hints" => Ok(SectionKey::Hints),
            "logs" => Ok(SectionKey::Logs),
            other => Err(format!("unknown section key '{other}'")),
        }
    }
}

impl From<SectionKey> for String {
    fn from(key: SectionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SectionKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A field inside a section. The section disambiguates e.g. record vs EVR title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Goal,
    Items,
    Description,
    Status,
    Hints,
    Tags,
    Evidence,
    Notes,
    EvrRefs,
    Verify,
    Expect,
    Class,
    LastRun,
    Proof,
    Entries,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Goal => "goal",
            Field::Items => "items",
            Field::Description => "description",
            Field::Status => "status",
            Field::Hints => "hints",
            Field::Tags => "tags",
            Field::Evidence => "evidence",
            Field::Notes => "notes",
            Field::EvrRefs => "evr_refs",
            Field::Verify => "verify",
            Field::Expect => "expect",
            Field::Class => "class",
            Field::LastRun => "last_run",
            Field::Proof => "proof",
            Field::Entries => "entries",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fingerprint of one section: a digest over its per-field hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SectionPrint {
    pub digest: String,
    #[serde(default)]
    pub fields: BTreeMap<Field, String>,
}

/// Section key → fingerprint, captured at last render or reconciliation.
pub type SectionFingerprints = BTreeMap<SectionKey, SectionPrint>;

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A unit of work inside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: NodeId,
    pub description: String,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Expected results this step exercises.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evr_refs: Vec<EvrId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A plan: ordered steps plus its own status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: NodeId,
    pub description: String,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// An expected result (EVR): a verifiable acceptance criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evr {
    pub id: EvrId,
    pub title: String,
    #[serde(default)]
    pub verify: Vec<String>,
    #[serde(default)]
    pub expect: Vec<String>,
    #[serde(default)]
    pub status: EvrStatus,
    #[serde(default)]
    pub class: EvrClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    /// Plans/steps referencing this EVR. Derived; see `TaskRecord::relink_evrs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_by: Vec<NodeId>,
}

/// A timestamped log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    /// New entry stamped now, truncated to whole seconds so it renders losslessly.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: truncate_to_seconds(Utc::now()),
            message: message.into(),
        }
    }
}

/// The authoritative task state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub evrs: Vec<Evr>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// `None` only for records written before version tags existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Record state at last render/reconciliation.
    #[serde(default)]
    pub fingerprints: SectionFingerprints,
    /// Version tag embedded in the panel at last render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_version: Option<VersionTag>,
    /// SHA-256 of the panel text last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_digest: Option<String>,
    /// Document the panel is bound to; set on first render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_path: Option<PathBuf>,
}

/// Drop sub-second precision.
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
