//! Panel status signal: how a document relates to its record without
//! parsing it.
//!
//! Signal precedence:
//! 1. `NeverRendered` (record carries no render snapshot)
//! 2. `Missing` (rendered before, document file gone)
//! 3. `Behind` (record version moved past the rendered version)
//! 4. `Edited` (document text differs from the last written digest)
//! 5. `Current`

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskpanel_core::TaskRecord;

use crate::store::RecordStore;
use crate::writer::content_digest;
use crate::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum PanelSignal {
    NeverRendered,
    Missing,
    Behind { reason: String },
    Edited,
    Current,
}

impl PanelSignal {
    pub fn label(&self) -> &'static str {
        match self {
            PanelSignal::NeverRendered => "never rendered",
            PanelSignal::Missing => "missing",
            PanelSignal::Behind { .. } => "behind",
            PanelSignal::Edited => "edited",
            PanelSignal::Current => "current",
        }
    }
}

pub fn check<S: RecordStore + ?Sized>(
    store: &S,
    record: &TaskRecord,
    path: &Path,
) -> Result<PanelSignal, SyncError> {
    let Some(expected) = record.panel_digest.as_deref() else {
        return Ok(PanelSignal::NeverRendered);
    };
    let Some(text) = store.read_document(path)? else {
        return Ok(PanelSignal::Missing);
    };
    if record.version != record.rendered_version {
        return Ok(PanelSignal::Behind {
            reason: format!("record changed {} ago", format_datetime_age(record.updated_at)),
        });
    }
    if content_digest(&text) != expected {
        return Ok(PanelSignal::Edited);
    }
    Ok(PanelSignal::Current)
}

/// Compact age of `timestamp` relative to now (`42s`, `5m`, `3h`, `2d`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
