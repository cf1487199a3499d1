//! Hash-gated atomic document writer.
//!
//! ## `atomic_write` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. SHA-256 hash the normalised content.
//! 3. Hash the file currently on disk (if any) → skip if identical.
//! 4. Write to `<path>.taskpanel.tmp`.
//! 5. Rename to final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Outcome of a document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf, digest: String },
    /// File was skipped; on-disk content already matches.
    Unchanged { path: PathBuf, digest: String },
}

impl WriteResult {
    pub fn digest(&self) -> &str {
        match self {
            WriteResult::Written { digest, .. } | WriteResult::Unchanged { digest, .. } => digest,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

/// Full SHA-256 hex digest of `content` after LF normalisation.
pub fn content_digest(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of the file at `path`, or `None` if it does not exist.
pub fn hash_file(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content_digest(&content))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Atomically write `content` to `path` unless it is already there.
pub fn atomic_write(path: &Path, content: &str) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.taskpanel.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<WriteResult, SyncError> {
    let normalized = content.replace("\r\n", "\n");
    let digest = content_digest(&normalized);

    if hash_file(path)?.as_deref() == Some(digest.as_str()) {
        tracing::debug!(path = %path.display(), "document unchanged");
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
            digest,
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, &normalized).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!(path = %path.display(), "wrote document");
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_write_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panel.md");
        let result = atomic_write(&path, "hello").unwrap();
        assert!(result.was_written());
        assert!(path.exists());
    }

    #[test]
    fn second_write_same_content_returns_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panel.md");
        atomic_write(&path, "same content").unwrap();
        let result = atomic_write(&path, "same content").unwrap();
        assert!(matches!(result, WriteResult::Unchanged { .. }));
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panel.md");
        atomic_write(&path, "v1").unwrap();
        let result = atomic_write(&path, "v2").unwrap();
        assert!(result.was_written());
        assert_eq!(fs::read_to_string(&path).unwrap(), "v2");
    }

    #[test]
    fn external_edit_is_overwritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panel.md");
        atomic_write(&path, "rendered").unwrap();
        fs::write(&path, "hand edited").unwrap();
        assert!(atomic_write(&path, "rendered").unwrap().was_written());
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.md");
        atomic_write(&path, "data").unwrap();
        let tmp_path = PathBuf::from(format!("{}.taskpanel.tmp", path.display()));
        assert!(!tmp_path.exists(), ".taskpanel.tmp must be cleaned up");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panels").join("nested").join("task.md");
        atomic_write(&path, "content").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn crlf_and_lf_content_share_the_same_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("normalize.md");

        let first = atomic_write(&path, "line1\r\nline2\r\n").unwrap();
        assert!(first.was_written());

        let second = atomic_write(&path, "line1\nline2\n").unwrap();
        assert!(matches!(second, WriteResult::Unchanged { .. }));
        assert_eq!(first.digest(), second.digest());

        let disk = fs::read_to_string(&path).unwrap();
        assert_eq!(disk, "line1\nline2\n");
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("panel.md");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Permission bits do not bind root.
        if fs::write(readonly_dir.join("probe"), "").is_ok() {
            return;
        }

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("panel.md.taskpanel.tmp");

        atomic_write_with_tmp(&path, "new content", &tmp_path)
            .expect_err("rename should fail on readonly dir");

        let current = fs::read_to_string(&path).unwrap();
        assert_eq!(current, "original", "original file should be intact");
        assert!(!tmp_path.exists(), ".taskpanel.tmp should be cleaned up");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();
    }
}
