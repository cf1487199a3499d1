//! Storage seam for the sync engine.
//!
//! [`RecordStore`] is everything the engine needs from persistence.
//! [`FileStore`] implements it over `<home>/.taskpanel/` using the core
//! store functions and the hash-gated [`atomic_write`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use taskpanel_core::{store, RecordId, TaskRecord};

use crate::error::{io_err, SyncError};
use crate::writer::{atomic_write, hash_file, WriteResult};

/// Modification signal for a document: mtime, length and content digest.
///
/// The digest catches same-length edits (a `[ ]` → `[x]` marker flip)
/// made within one mtime tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSignal {
    pub modified: DateTime<Utc>,
    pub len: u64,
    pub digest: String,
}

/// Persistence used by [`SyncEngine`](crate::SyncEngine).
pub trait RecordStore: Send + Sync {
    fn load_record(&self, id: &RecordId) -> Result<TaskRecord, SyncError>;

    fn save_record(&self, record: &TaskRecord) -> Result<(), SyncError>;

    /// Document text, or `None` when the file does not exist.
    fn read_document(&self, path: &Path) -> Result<Option<String>, SyncError>;

    fn write_document(&self, path: &Path, text: &str) -> Result<WriteResult, SyncError>;

    /// `None` when the file does not exist.
    fn document_signal(&self, path: &Path) -> Result<Option<DocumentSignal>, SyncError>;
}

/// File-backed store rooted at a home directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    home: PathBuf,
}

impl FileStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        FileStore { home: home.into() }
    }

    /// Store rooted at `dirs::home_dir()`.
    pub fn from_env() -> Result<Self, SyncError> {
        Ok(FileStore::new(store::home()?))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Default document location for `id`.
    pub fn panel_path(&self, id: &RecordId) -> PathBuf {
        store::panel_path_at(&self.home, id)
    }
}

impl RecordStore for FileStore {
    fn load_record(&self, id: &RecordId) -> Result<TaskRecord, SyncError> {
        Ok(store::load_record_at(&self.home, id)?)
    }

    fn save_record(&self, record: &TaskRecord) -> Result<(), SyncError> {
        Ok(store::save_record_at(&self.home, record)?)
    }

    fn read_document(&self, path: &Path) -> Result<Option<String>, SyncError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(path, err)),
        }
    }

    fn write_document(&self, path: &Path, text: &str) -> Result<WriteResult, SyncError> {
        atomic_write(path, text)
    }

    fn document_signal(&self, path: &Path) -> Result<Option<DocumentSignal>, SyncError> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(path, err)),
        };
        let modified = meta.modified().map_err(|e| io_err(path, e))?;
        let Some(digest) = hash_file(path)? else {
            return Ok(None);
        };
        Ok(Some(DocumentSignal {
            modified: DateTime::<Utc>::from(modified),
            len: meta.len(),
            digest,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_document_reads_as_none() {
        let home = TempDir::new().unwrap();
        let store = FileStore::new(home.path());
        let path = home.path().join("nope.md");
        assert!(store.read_document(&path).unwrap().is_none());
        assert!(store.document_signal(&path).unwrap().is_none());
    }

    #[test]
    fn signal_tracks_length() {
        let home = TempDir::new().unwrap();
        let store = FileStore::new(home.path());
        let path = home.path().join("panel.md");
        store.write_document(&path, "abc").unwrap();
        let first = store.document_signal(&path).unwrap().unwrap();
        assert_eq!(first.len, 3);
        store.write_document(&path, "abcdef").unwrap();
        let second = store.document_signal(&path).unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn signal_tracks_same_length_edits() {
        let home = TempDir::new().unwrap();
        let store = FileStore::new(home.path());
        let path = home.path().join("panel.md");
        store.write_document(&path, "- [ ] plan\n").unwrap();
        let before = store.document_signal(&path).unwrap().unwrap();
        std::fs::write(&path, "- [x] plan\n").unwrap();
        filetime::set_file_mtime(
            &path,
            filetime::FileTime::from_system_time(before.modified.into()),
        )
        .unwrap();

        let after = store.document_signal(&path).unwrap().unwrap();
        assert_eq!((after.modified, after.len), (before.modified, before.len));
        assert_ne!(before, after);
    }

    #[test]
    fn records_roundtrip_through_core_store() {
        let home = TempDir::new().unwrap();
        let store = FileStore::new(home.path());
        let record = TaskRecord::new(RecordId::from("fs"), "File store");
        store.save_record(&record).unwrap();
        assert_eq!(store.load_record(&record.id).unwrap(), record);
        assert!(store.panel_path(&record.id).ends_with(".taskpanel/panels/fs.md"));
    }
}
