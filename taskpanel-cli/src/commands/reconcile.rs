//! `taskpanel render | preview | apply` — the reconciliation commands.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use taskpanel_core::VersionTag;
use taskpanel_sync::{Change, SyncPreview, Winner, WriteResult};

use super::{open, RecordArgs};

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub record: RecordArgs,
}

impl RenderArgs {
    pub async fn run(self) -> Result<()> {
        let (engine, mut ctx) = open(&self.record)?;
        let write = engine
            .render_panel(&mut ctx)
            .await
            .with_context(|| format!("render failed for '{}'", self.record.id))?;
        print_write(&self.record.id, &write);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PreviewArgs {
    pub async fn run(self) -> Result<()> {
        let (engine, mut ctx) = open(&self.record)?;
        let (_, preview) = engine
            .load(&mut ctx)
            .await
            .with_context(|| format!("preview failed for '{}'", self.record.id))?;
        ctx.end_chain();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&preview).context("failed to serialize preview JSON")?
            );
            return Ok(());
        }
        println!("Preview of '{}' ({})", self.record.id, ctx.path().display());
        print_preview(&preview);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ApplyJson<'a> {
    record: &'a str,
    version: Option<&'a VersionTag>,
    written: bool,
    #[serde(flatten)]
    preview: &'a SyncPreview,
}

impl ApplyArgs {
    pub async fn run(self) -> Result<()> {
        let (engine, mut ctx) = open(&self.record)?;
        let (record, _) = engine
            .load(&mut ctx)
            .await
            .with_context(|| format!("failed to load '{}'", self.record.id))?;
        let reconciled = engine
            .reconcile_and_apply(&mut ctx, record)
            .await
            .with_context(|| format!("apply failed for '{}'", self.record.id))?;

        if self.json {
            let payload = ApplyJson {
                record: &self.record.id,
                version: reconciled.record.version.as_ref(),
                written: reconciled.write.was_written(),
                preview: &reconciled.preview,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize apply JSON")?
            );
            return Ok(());
        }
        print_preview(&reconciled.preview);
        print_write(&self.record.id, &reconciled.write);
        Ok(())
    }
}

pub fn print_preview(preview: &SyncPreview) {
    if preview.is_clean() {
        println!("  {}", "No pending panel edits.".bright_black());
        return;
    }
    for change in &preview.changes {
        match change {
            Change::Content(c) => println!(
                "  {} {}.{}: {} → {}",
                "~".cyan().bold(),
                c.section,
                c.field,
                c.old_value,
                c.new_value
            ),
            Change::Status(s) => println!(
                "  {} {}: {} → {} (pending; use `taskpanel set-status`)",
                "◦".yellow().bold(),
                s.node,
                s.old_status,
                s.new_status
            ),
            // Conflict candidates are reported resolved below.
            Change::Conflict(_) => {}
        }
    }
    for c in &preview.conflicts {
        let winner = match c.winner {
            Winner::Ours => "record wins",
            Winner::Theirs => "panel wins",
        };
        println!(
            "  {} {}.{}: record {} vs panel {} → {winner} ({})",
            "!".red().bold(),
            c.section,
            c.field,
            c.ours,
            c.theirs,
            c.reason
        );
    }
    for w in &preview.warnings {
        println!("  {} {w}", "⚠".yellow());
    }
}

fn print_write(id: &str, write: &WriteResult) {
    match write {
        WriteResult::Written { path, .. } => println!("✓ '{id}' panel written  ✎  {}", path.display()),
        WriteResult::Unchanged { path, .. } => println!("✓ '{id}' panel up to date  ·  {}", path.display()),
    }
}
