//! taskpanel core library — record types, structured-record API, record store, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes, enums and the [`TaskRecord`] model
//! - [`record`] — the structured-record mutation API (the only status path)
//! - [`error`] — [`StoreError`], [`RecordError`]
//! - [`store`] — load / save / init against `~/.taskpanel/`

pub mod error;
pub mod record;
pub mod store;
pub mod types;

pub use error::{RecordError, StoreError};
pub use record::NodeRef;
pub use types::{
    Evr, EvrClass, EvrId, EvrStatus, Field, LogEntry, NodeId, Plan, PlanStatus, RecordId,
    SectionFingerprints, SectionKey, SectionPrint, Step, TaskRecord, VersionTag,
};
