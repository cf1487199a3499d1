//! Audit trail of reconciliations.
//!
//! [`JsonlAuditLog`] appends one JSON object per line to
//! `<home>/.taskpanel/audit/<record_id>.jsonl`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskpanel_core::{store, RecordId, VersionTag};
use taskpanel_renderer::ParseWarning;

use crate::change::{Change, ResolvedConflict};
use crate::error::{io_err, SyncError};

/// One reconciliation, previewed or applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub record: RecordId,
    pub document: PathBuf,
    pub version_before: Option<VersionTag>,
    pub version_after: Option<VersionTag>,
    pub applied: bool,
    pub changes: Vec<Change>,
    pub conflicts: Vec<ResolvedConflict>,
    pub warnings: Vec<ParseWarning>,
}

pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<(), SyncError>;
}

/// Per-record JSON-lines files under a home directory.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    home: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        JsonlAuditLog { home: home.into() }
    }

    pub fn path(&self, record: &RecordId) -> PathBuf {
        store::audit_path_at(&self.home, record)
    }

    /// Every entry logged for `record`, oldest first.
    pub fn read(&self, record: &RecordId) -> Result<Vec<serde_json::Value>, SyncError> {
        read_lines(&self.path(record))
    }
}

fn read_lines(path: &Path) -> Result<Vec<serde_json::Value>, SyncError> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(SyncError::from))
        .collect()
}

impl AuditSink for JsonlAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<(), SyncError> {
        let path = self.path(&entry.record);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| io_err(&path, e))?;
        tracing::debug!(record = %entry.record, path = %path.display(), "audit entry appended");
        Ok(())
    }
}

/// In-memory sink for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: &AuditEntry) -> Result<(), SyncError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(record: &str) -> AuditEntry {
        AuditEntry {
            at: Utc::now(),
            record: RecordId::from(record),
            document: PathBuf::from("/tmp/panel.md"),
            version_before: None,
            version_after: None,
            applied: false,
            changes: vec![],
            conflicts: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn entries_append_one_line_each() {
        let home = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(home.path());
        log.append(&entry("a")).unwrap();
        log.append(&entry("a")).unwrap();
        log.append(&entry("b")).unwrap();

        let lines = log.read(&RecordId::from("a")).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record"], "a");
        assert_eq!(lines[0]["applied"], false);
        assert!(log.path(&RecordId::from("a")).ends_with(".taskpanel/audit/a.jsonl"));
    }

    #[test]
    fn unknown_record_has_empty_log() {
        let home = TempDir::new().unwrap();
        let log = JsonlAuditLog::new(home.path());
        assert!(log.read(&RecordId::from("none")).unwrap().is_empty());
    }

    #[test]
    fn memory_sink_keeps_entries() {
        let sink = MemoryAuditSink::default();
        sink.append(&entry("m")).unwrap();
        assert_eq!(sink.entries().len(), 1);
    }
}
