//! Request-scoped reconciliation state.
//!
//! A [`SyncContext`] binds one record id to one document path for the
//! length of a call chain (a CLI command, a request). It memoizes the last
//! preview so a preview → apply → preview chain parses the document once.

use std::path::{Path, PathBuf};

use serde::Serialize;

use taskpanel_core::{RecordId, VersionTag};

use crate::change::SyncPreview;
use crate::store::DocumentSignal;

/// Where the current chain stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Unsynced,
    Previewed,
    Applied,
    /// A preview was taken but never applied.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChainStats {
    /// Physical document parses.
    pub parses: usize,
    pub cache_hits: usize,
}

/// Cache key: a different signal or record version is a different revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheKey {
    pub signal: Option<DocumentSignal>,
    pub version: Option<VersionTag>,
}

#[derive(Debug)]
pub struct SyncContext {
    record: RecordId,
    path: PathBuf,
    pub(crate) phase: SyncPhase,
    pub(crate) stats: ChainStats,
    pub(crate) cache: Option<(CacheKey, SyncPreview)>,
}

impl SyncContext {
    pub(crate) fn new(record: RecordId, path: PathBuf) -> Self {
        SyncContext {
            record,
            path,
            phase: SyncPhase::Unsynced,
            stats: ChainStats::default(),
            cache: None,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn stats(&self) -> ChainStats {
        self.stats
    }

    pub(crate) fn cached(&mut self, key: &CacheKey) -> Option<SyncPreview> {
        match &self.cache {
            Some((cached, preview)) if cached == key => {
                self.stats.cache_hits += 1;
                Some(preview.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn store(&mut self, key: CacheKey, preview: SyncPreview) {
        self.cache = Some((key, preview));
    }

    /// Close the chain: drop the cache; an unapplied preview is discarded.
    pub fn end_chain(&mut self) {
        self.cache = None;
        if self.phase == SyncPhase::Previewed {
            self.phase = SyncPhase::Discarded;
        }
    }
}
