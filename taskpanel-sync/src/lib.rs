//! # taskpanel-sync
//!
//! Lazy reconciliation between a [`TaskRecord`](taskpanel_core::TaskRecord)
//! and its Markdown panel.
//!
//! Nothing watches the document. Every read goes through
//! [`SyncEngine::load`] or [`SyncEngine::preview`], every write through
//! [`SyncEngine::mutate`], and each one folds in pending document edits first.
//! Checklist markers never change a persisted status; they survive re-renders
//! as pending status changes until the record API sets the status.

pub mod apply;
pub mod audit;
pub mod change;
pub mod config;
pub mod conflict;
pub mod context;
pub mod detect;
pub mod diff;
pub mod engine;
pub mod error;
pub mod status;
pub mod store;
pub mod writer;

pub use audit::{AuditEntry, AuditSink, JsonlAuditLog, MemoryAuditSink};
pub use change::{
    Change, ConflictReason, ContentChange, Detection, FieldConflict, FieldValue, ResolvedConflict,
    StatusChange, SyncPreview, Winner,
};
pub use config::EngineConfig;
pub use context::{ChainStats, SyncContext, SyncPhase};
pub use detect::detect;
pub use engine::{Mutation, Reconciled, SyncEngine};
pub use error::SyncError;
pub use status::PanelSignal;
pub use store::{DocumentSignal, FileStore, RecordStore};
pub use writer::WriteResult;
