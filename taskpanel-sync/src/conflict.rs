//! Conflict resolution for fields both sides changed.
//!
//! Precedence:
//!
//! 1. Record and document both carry a version tag and the tags differ:
//!    the record wins (`etag_mismatch`).
//! 2. Otherwise the later of `record.updated_at` and the document time wins,
//!    ties going to the record (`stale_timestamp`). The document time is the
//!    meta header's `updated_at`, or the file modification time without one.

use chrono::{DateTime, Utc};

use taskpanel_core::TaskRecord;
use taskpanel_renderer::PanelMeta;

use crate::change::{ConflictReason, FieldConflict, ResolvedConflict, Winner};

pub fn resolve<'a>(
    candidates: impl IntoIterator<Item = &'a FieldConflict>,
    record: &TaskRecord,
    meta: &PanelMeta,
    document_mtime: Option<DateTime<Utc>>,
) -> Vec<ResolvedConflict> {
    let (winner, reason) = decide(record, meta, document_mtime);
    candidates
        .into_iter()
        .map(|candidate| {
            if winner == Winner::Ours {
                tracing::warn!(
                    record = %record.id,
                    section = %candidate.section,
                    field = %candidate.field,
                    %reason,
                    "document edit discarded; record value kept"
                );
            } else {
                tracing::info!(
                    record = %record.id,
                    section = %candidate.section,
                    field = %candidate.field,
                    %reason,
                    "document edit wins conflict"
                );
            }
            ResolvedConflict {
                section: candidate.section.clone(),
                field: candidate.field,
                ours: candidate.ours.clone(),
                theirs: candidate.theirs.clone(),
                winner,
                reason,
            }
        })
        .collect()
}

fn decide(
    record: &TaskRecord,
    meta: &PanelMeta,
    document_mtime: Option<DateTime<Utc>>,
) -> (Winner, ConflictReason) {
    if let (Some(ours), Some(theirs)) = (&record.version, &meta.version) {
        if ours != theirs {
            return (Winner::Ours, ConflictReason::EtagMismatch);
        }
    }
    let winner = match meta.updated_at.or(document_mtime) {
        Some(document_time) if document_time > record.updated_at => Winner::Theirs,
        _ => Winner::Ours,
    };
    (winner, ConflictReason::StaleTimestamp)
}
