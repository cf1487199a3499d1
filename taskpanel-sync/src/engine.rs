//! Lazy sync engine.
//!
//! Nothing reconciles in the background. Read paths call [`SyncEngine::load`]
//! or [`SyncEngine::preview`]; write paths call [`SyncEngine::mutate`], which
//! folds pending document edits into the record before the caller's change.
//!
//! Previews and reconciliations of one record are serialized with a
//! per-record async mutex. Different records never wait on each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use taskpanel_core::{RecordId, SectionKey, TaskRecord};
use taskpanel_renderer::{parse, record_prints, PanelRenderer, PendingMarkers};

use crate::apply::apply_value;
use crate::audit::{AuditEntry, AuditSink};
use crate::change::{Change, StatusChange, SyncPreview, Winner};
use crate::config::EngineConfig;
use crate::conflict::resolve;
use crate::context::{CacheKey, SyncContext, SyncPhase};
use crate::detect::detect;
use crate::error::{invalid, SyncError};
use crate::store::RecordStore;
use crate::writer::{content_digest, WriteResult};

type RecordLock = Arc<tokio::sync::Mutex<()>>;

/// Outcome of [`SyncEngine::reconcile_and_apply`].
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub record: TaskRecord,
    pub preview: SyncPreview,
    pub write: WriteResult,
}

/// Outcome of [`SyncEngine::mutate`].
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    pub value: T,
    pub record: TaskRecord,
    /// What reconciliation folded in before the mutation ran.
    pub preview: SyncPreview,
    pub write: WriteResult,
}

pub struct SyncEngine<S, A> {
    store: S,
    audit: A,
    renderer: PanelRenderer,
    config: EngineConfig,
    locks: Mutex<HashMap<RecordId, RecordLock>>,
    bindings: Mutex<HashMap<RecordId, PathBuf>>,
}

impl<S: RecordStore, A: AuditSink> SyncEngine<S, A> {
    pub fn new(store: S, audit: A, config: EngineConfig) -> Result<Self, SyncError> {
        Ok(SyncEngine {
            store,
            audit,
            renderer: PanelRenderer::new()?,
            config,
            locks: Mutex::new(HashMap::new()),
            bindings: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit_sink(&self) -> &A {
        &self.audit
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a chain for `record` against the document at `path`.
    ///
    /// A record is bound to the first path it is used with; any other path
    /// is rejected. The binding persists in the record once it is rendered.
    pub fn context(&self, record: RecordId, path: impl Into<PathBuf>) -> Result<SyncContext, SyncError> {
        let path = path.into();
        // Missing or unreadable records fail later, on load.
        if let Ok(stored) = self.store.load_record(&record) {
            check_binding(&stored, &path)?;
        }
        let mut bindings = self.bindings.lock().unwrap_or_else(|p| p.into_inner());
        match bindings.get(&record) {
            Some(bound) if bound != &path => {
                return Err(invalid(
                    &record,
                    format!(
                        "already bound to {}; refusing second document {}",
                        bound.display(),
                        path.display()
                    ),
                ));
            }
            Some(_) => {}
            None => {
                bindings.insert(record.clone(), path.clone());
            }
        }
        Ok(SyncContext::new(record, path))
    }

    fn lock_for(&self, record: &RecordId) -> RecordLock {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(record.clone()).or_default().clone()
    }

    // -----------------------------------------------------------------------
    // Read paths
    // -----------------------------------------------------------------------

    /// Dry run: what reconciling `record` with its document would do.
    ///
    /// Writes neither the record nor the document. Waits for any running
    /// reconciliation of the same record.
    pub async fn preview(&self, ctx: &mut SyncContext, record: &TaskRecord) -> Result<SyncPreview, SyncError> {
        let lock = self.lock_for(&record.id);
        let _guard = lock.lock_owned().await;
        self.preview_locked(ctx, record)
    }

    /// Load the bound record and preview its document, both under the
    /// record's lock so the pair is consistent.
    pub async fn load(&self, ctx: &mut SyncContext) -> Result<(TaskRecord, SyncPreview), SyncError> {
        let lock = self.lock_for(ctx.record_id());
        let _guard = lock.lock_owned().await;
        let record = self.store.load_record(ctx.record_id())?;
        let preview = self.preview_locked(ctx, &record)?;
        Ok((record, preview))
    }

    fn preview_locked(&self, ctx: &mut SyncContext, record: &TaskRecord) -> Result<SyncPreview, SyncError> {
        let preview = self.preview_inner(ctx, record)?;
        ctx.phase = SyncPhase::Previewed;
        Ok(preview)
    }

    fn preview_inner(&self, ctx: &mut SyncContext, record: &TaskRecord) -> Result<SyncPreview, SyncError> {
        if &record.id != ctx.record_id() {
            return Err(invalid(
                &record.id,
                format!("chain is bound to record '{}'", ctx.record_id()),
            ));
        }
        check_binding(record, ctx.path())?;
        let signal = self.store.document_signal(ctx.path())?;
        let key = CacheKey {
            signal,
            version: record.version.clone(),
        };
        if let Some(preview) = ctx.cached(&key) {
            tracing::debug!(record = %record.id, path = %ctx.path().display(), "preview cache hit");
            return Ok(preview);
        }

        let Some(text) = self.store.read_document(ctx.path())? else {
            let preview = SyncPreview::default();
            ctx.store(key, preview.clone());
            return Ok(preview);
        };
        let panel = parse(&text);
        ctx.stats.parses += 1;
        if let Some(owner) = panel.meta.record.as_ref().filter(|owner| *owner != ctx.record_id()) {
            return Err(invalid(
                &record.id,
                format!("{} was rendered for record '{owner}'", ctx.path().display()),
            ));
        }

        let detection = detect(&panel, record);
        let conflicts = resolve(
            detection.conflicts(),
            record,
            &panel.meta,
            key.signal.as_ref().map(|s| s.modified),
        );
        let preview = SyncPreview {
            applied: false,
            changes: detection
                .changes
                .into_iter()
                .filter(|c| !matches!(c, Change::Conflict(_)))
                .collect(),
            conflicts,
            warnings: detection.warnings,
        };
        tracing::debug!(
            record = %record.id,
            changes = preview.changes.len(),
            conflicts = preview.conflicts.len(),
            warnings = preview.warnings.len(),
            "document parsed"
        );

        if !preview.changes.is_empty() || !preview.conflicts.is_empty() {
            self.audit(ctx.path(), record, record, &preview)?;
        }
        ctx.store(key, preview.clone());
        Ok(preview)
    }

    // -----------------------------------------------------------------------
    // Write paths
    // -----------------------------------------------------------------------

    /// Fold the document's accepted edits into `record`, then persist the
    /// record and re-render the document. Pending markers stay in the text.
    pub async fn reconcile_and_apply(
        &self,
        ctx: &mut SyncContext,
        record: TaskRecord,
    ) -> Result<Reconciled, SyncError> {
        let lock = self.lock_for(&record.id);
        let _guard = lock.lock_owned().await;
        self.reconcile_locked(ctx, record)
    }

    /// Load, reconcile, run `f` against the record, then persist and
    /// re-render. The only path that changes plan or step status.
    pub async fn mutate<T, F>(&self, ctx: &mut SyncContext, f: F) -> Result<Mutation<T>, SyncError>
    where
        F: FnOnce(&mut TaskRecord) -> Result<T, SyncError>,
    {
        let lock = self.lock_for(ctx.record_id());
        let _guard = lock.lock_owned().await;

        let record = self.store.load_record(ctx.record_id())?;
        let Reconciled { mut record, preview, .. } = self.reconcile_locked(ctx, record)?;

        let before = record.clone();
        let value = f(&mut record)?;
        if record.id != before.id {
            return Err(invalid(&before.id, "mutation must not change the record id"));
        }
        if record != before && record.version == before.version {
            record.touch();
        }
        record.validate().map_err(|e| invalid(&record.id, e.to_string()))?;

        let mut pending = pending_markers(&preview);
        pending.retain(|node, _| {
            before.node_status(node).is_some() && record.node_status(node) == before.node_status(node)
        });

        let text = self.finalize(&mut record, ctx.path(), &pending)?;
        if record != before {
            self.store.save_record(&record)?;
        }
        let write = self.store.write_document(ctx.path(), &text)?;
        tracing::info!(record = %record.id, written = write.was_written(), "record mutated");

        let after = SyncPreview {
            applied: false,
            changes: pending_changes(&record, &pending),
            ..SyncPreview::default()
        };
        self.remember(ctx, &record, after)?;
        ctx.phase = SyncPhase::Applied;

        Ok(Mutation {
            value,
            record,
            preview,
            write,
        })
    }

    /// Reconcile the bound record and return the document write.
    pub async fn render_panel(&self, ctx: &mut SyncContext) -> Result<WriteResult, SyncError> {
        let record = self.store.load_record(ctx.record_id())?;
        Ok(self.reconcile_and_apply(ctx, record).await?.write)
    }

    fn reconcile_locked(&self, ctx: &mut SyncContext, mut record: TaskRecord) -> Result<Reconciled, SyncError> {
        record.validate().map_err(|e| invalid(&record.id, e.to_string()))?;
        let mut preview = self.preview_inner(ctx, &record)?;

        if self.config.block_on_warnings && !preview.warnings.is_empty() {
            ctx.phase = SyncPhase::Discarded;
            return Err(SyncError::Blocked {
                record: record.id.clone(),
                warnings: preview.warnings.len(),
            });
        }

        let original = record.clone();
        let mut mutated = false;
        for change in preview.content_changes() {
            mutated |= apply_value(&mut record, &change.section, change.field, &change.new_value);
        }
        for conflict in preview.conflicts.iter().filter(|c| c.winner == Winner::Theirs) {
            mutated |= apply_value(&mut record, &conflict.section, conflict.field, &conflict.theirs);
        }
        if mutated {
            record.touch();
            record.validate().map_err(|e| invalid(&record.id, e.to_string()))?;
        }

        let pending = pending_markers(&preview);
        let text = self.finalize(&mut record, ctx.path(), &pending)?;
        if record != original {
            self.store.save_record(&record)?;
        }
        let write = self.store.write_document(ctx.path(), &text)?;

        preview.applied = true;
        if !preview.changes.is_empty() || !preview.conflicts.is_empty() {
            self.audit(ctx.path(), &original, &record, &preview)?;
        }
        tracing::info!(
            record = %record.id,
            applied = preview.content_changes().count(),
            pending = pending.len(),
            conflicts = preview.conflicts.len(),
            written = write.was_written(),
            "document reconciled"
        );

        let after = SyncPreview {
            applied: false,
            changes: pending_changes(&record, &pending),
            ..SyncPreview::default()
        };
        self.remember(ctx, &record, after)?;
        ctx.phase = SyncPhase::Applied;

        Ok(Reconciled {
            record,
            preview,
            write,
        })
    }

    /// Snapshot prints and render; returns the document text.
    fn finalize(&self, record: &mut TaskRecord, path: &Path, pending: &PendingMarkers) -> Result<String, SyncError> {
        record.fingerprints = record_prints(record);
        record.panel_path = Some(path.to_path_buf());
        record.rendered_version = record.version.clone();
        let text = self.renderer.render_with_pending(record, pending)?;
        record.panel_digest = Some(content_digest(&text));
        Ok(text)
    }

    /// Cache what a preview of the freshly written document would return.
    fn remember(&self, ctx: &mut SyncContext, record: &TaskRecord, preview: SyncPreview) -> Result<(), SyncError> {
        let key = CacheKey {
            signal: self.store.document_signal(ctx.path())?,
            version: record.version.clone(),
        };
        ctx.store(key, preview);
        Ok(())
    }

    fn audit(
        &self,
        path: &Path,
        before: &TaskRecord,
        after: &TaskRecord,
        preview: &SyncPreview,
    ) -> Result<(), SyncError> {
        if !self.config.audit {
            return Ok(());
        }
        self.audit.append(&AuditEntry {
            at: Utc::now(),
            record: after.id.clone(),
            document: path.to_path_buf(),
            version_before: before.version.clone(),
            version_after: after.version.clone(),
            applied: preview.applied,
            changes: preview.changes.clone(),
            conflicts: preview.conflicts.clone(),
            warnings: preview.warnings.clone(),
        })
    }
}

fn check_binding(record: &TaskRecord, path: &Path) -> Result<(), SyncError> {
    match &record.panel_path {
        Some(bound) if bound != path => Err(invalid(
            &record.id,
            format!(
                "panel is bound to {}; refusing second document {}",
                bound.display(),
                path.display()
            ),
        )),
        _ => Ok(()),
    }
}

fn pending_markers(preview: &SyncPreview) -> PendingMarkers {
    preview
        .status_changes()
        .map(|change| (change.node.clone(), change.new_status))
        .collect()
}

/// Status changes a fresh parse of a document rendered with `pending` would
/// report, in the same section order.
fn pending_changes(record: &TaskRecord, pending: &PendingMarkers) -> Vec<Change> {
    let mut changes: Vec<(SectionKey, StatusChange)> = pending
        .iter()
        .filter_map(|(node, status)| {
            let old_status = record.node_status(node)?;
            let key = if node.is_step() {
                SectionKey::Step(node.clone())
            } else {
                SectionKey::Plan(node.clone())
            };
            (old_status != *status).then(|| {
                let change = StatusChange {
                    node: node.clone(),
                    old_status,
                    new_status: *status,
                };
                (key, change)
            })
        })
        .collect();
    changes.sort_by(|a, b| a.0.cmp(&b.0));
    changes.into_iter().map(|(_, change)| Change::Status(change)).collect()
}
