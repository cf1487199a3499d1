//! Per-record YAML store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.taskpanel/
//!   records/
//!     <record_id>.yaml   (one file per task record — mode 0600)
//!   panels/
//!     <record_id>.md     (default panel location)
//!   audit/
//!     <record_id>.jsonl  (reconciliation audit trail)
//!   config.yaml          (optional engine configuration)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::types::{RecordId, TaskRecord};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.taskpanel/` — pure, no I/O.
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".taskpanel")
}

/// `<home>/.taskpanel/records/`
///
/// Creates the directory (mode `0700`) if it does not yet exist.
pub fn records_dir_at(home: &Path) -> Result<PathBuf, StoreError> {
    let dir = root_at(home).join("records");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.taskpanel/records/<id>.yaml` — pure, no I/O.
pub fn record_path_at(home: &Path, id: &RecordId) -> PathBuf {
    root_at(home).join("records").join(format!("{}.yaml", id.0))
}

/// `<home>/.taskpanel/panels/<id>.md` — pure, no I/O.
pub fn panel_path_at(home: &Path, id: &RecordId) -> PathBuf {
    root_at(home).join("panels").join(format!("{}.md", id.0))
}

/// `<home>/.taskpanel/audit/<id>.jsonl` — pure, no I/O.
pub fn audit_path_at(home: &Path, id: &RecordId) -> PathBuf {
    root_at(home).join("audit").join(format!("{}.jsonl", id.0))
}

/// `<home>/.taskpanel/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a single record from `<home>/.taskpanel/records/<id>.yaml`.
///
/// Returns `StoreError::RecordNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_record_at(home: &Path, id: &RecordId) -> Result<TaskRecord, StoreError> {
    let path = record_path_at(home, id);
    if !path.exists() {
        return Err(StoreError::RecordNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_record_at` convenience wrapper.
pub fn load_record(id: &RecordId) -> Result<TaskRecord, StoreError> {
    load_record_at(&home()?, id)
}

/// All records under `<home>/.taskpanel/records/`, sorted by id.
pub fn list_records_at(home: &Path) -> Result<Vec<TaskRecord>, StoreError> {
    let dir = root_at(home).join("records");
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut records = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let record: TaskRecord = serde_yaml::from_str(&contents)
            .map_err(|e| StoreError::Parse { path: path.clone(), source: e })?;
        records.push(record);
    }
    Ok(records)
}

/// `list_records_at` convenience wrapper.
pub fn list_records() -> Result<Vec<TaskRecord>, StoreError> {
    list_records_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a record to `<home>/.taskpanel/records/<id>.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
pub fn save_record_at(home: &Path, record: &TaskRecord) -> Result<(), StoreError> {
    records_dir_at(home)?;
    let path = record_path_at(home, &record.id);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", record.id.0));

    let yaml = serde_yaml::to_string(record)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(())
}

/// `save_record_at` convenience wrapper.
pub fn save_record(record: &TaskRecord) -> Result<(), StoreError> {
    save_record_at(&home()?, record)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create the record `id` with `title`.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_record_at(home: &Path, id: RecordId, title: &str) -> Result<TaskRecord, StoreError> {
    let path = record_path_at(home, &id);
    if path.exists() {
        return load_record_at(home, &id);
    }
    let record = TaskRecord::new(id, title);
    save_record_at(home, &record)?;
    Ok(record)
}

/// `init_record_at` convenience wrapper.
pub fn init_record(id: RecordId, title: &str) -> Result<TaskRecord, StoreError> {
    init_record_at(&home()?, id, title)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Home directory from the environment.
pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
