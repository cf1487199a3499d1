//! Subcommands. Every read goes through [`SyncEngine::load`], every write
//! through [`SyncEngine::mutate`].

pub mod diff;
pub mod edit;
pub mod init;
pub mod reconcile;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use taskpanel_core::RecordId;
use taskpanel_sync::{EngineConfig, FileStore, JsonlAuditLog, RecordStore, SyncContext, SyncEngine};

pub type Engine = SyncEngine<FileStore, JsonlAuditLog>;

/// Record selector shared by every per-record command.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Record id (file name under ~/.taskpanel/records/).
    pub id: String,

    /// Panel document to use instead of the bound one (default
    /// ~/.taskpanel/panels/<id>.md).
    #[arg(long, value_name = "PATH")]
    pub doc: Option<PathBuf>,
}

impl RecordArgs {
    pub fn record_id(&self) -> RecordId {
        RecordId::from(self.id.as_str())
    }
}

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn engine() -> Result<Engine> {
    let home = home()?;
    let config = EngineConfig::load_at(&home).context("failed to load ~/.taskpanel/config.yaml")?;
    SyncEngine::new(FileStore::new(&home), JsonlAuditLog::new(&home), config)
        .context("failed to initialise panel renderer")
}

/// Engine plus a chain bound to the selected record and document.
pub fn open(args: &RecordArgs) -> Result<(Engine, SyncContext)> {
    let engine = engine()?;
    let id = args.record_id();
    let path = match &args.doc {
        Some(doc) => doc.clone(),
        None => bound_or_default(&engine, &id),
    };
    let ctx = engine
        .context(id, path)
        .with_context(|| format!("cannot bind record '{}'", args.id))?;
    Ok((engine, ctx))
}

/// Document the record was last rendered to, else the default location.
pub fn bound_or_default(engine: &Engine, id: &RecordId) -> PathBuf {
    engine
        .store()
        .load_record(id)
        .ok()
        .and_then(|record| record.panel_path)
        .unwrap_or_else(|| engine.store().panel_path(id))
}
