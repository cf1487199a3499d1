//! Unified diff between a document on disk and a fresh render of its record.
//!
//! Display only: nothing is parsed or written.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use taskpanel_core::TaskRecord;
use taskpanel_renderer::PanelRenderer;

use crate::store::RecordStore;
use crate::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// `None` when the document already matches the render.
///
/// A missing document diffs against empty text.
pub fn diff_panel<S: RecordStore + ?Sized>(
    store: &S,
    record: &TaskRecord,
    path: &Path,
) -> Result<Option<PanelDiff>, SyncError> {
    let rendered = PanelRenderer::new()?.render(record)?;
    let existing = store
        .read_document(path)?
        .map(|text| text.replace("\r\n", "\n"))
        .unwrap_or_default();
    if existing == rendered {
        return Ok(None);
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    let unified = TextDiff::from_lines(&existing, &rendered)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();

    Ok(Some(PanelDiff {
        path: path.to_path_buf(),
        unified_diff: unified,
    }))
}
