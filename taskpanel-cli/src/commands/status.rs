//! `taskpanel status` — how each panel relates to its record.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use taskpanel_core::{store, RecordId, TaskRecord};
use taskpanel_sync::status::{check, format_datetime_age, PanelSignal};

use super::{engine, home, Engine};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only this record.
    pub id: Option<String>,

    /// Panel document for `<id>` instead of the default location.
    #[arg(long, value_name = "PATH", requires = "id")]
    pub doc: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RecordStatus {
    record: String,
    title: String,
    panel: PathBuf,
    #[serde(flatten)]
    signal: PanelSignal,
    pending_changes: usize,
    conflicts: usize,
    warnings: usize,
    updated_at: DateTime<Utc>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "record")]
    record: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "pending")]
    pending: usize,
    #[tabled(rename = "updated")]
    updated: String,
}

impl StatusArgs {
    pub async fn run(self) -> Result<()> {
        let home = home()?;
        let engine = engine()?;

        let records = match &self.id {
            Some(id) => vec![store::load_record_at(&home, &RecordId::from(id.as_str()))
                .with_context(|| format!("record '{id}' not found; run `taskpanel init` first"))?],
            None => store::list_records_at(&home).context("failed to list records")?,
        };

        let mut rows = Vec::new();
        for record in records {
            let path = self
                .doc
                .clone()
                .or_else(|| record.panel_path.clone())
                .unwrap_or_else(|| engine.store().panel_path(&record.id));
            rows.push(
                record_status(&engine, record, path)
                    .await
                    .context("status check failed")?,
            );
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(rows);
        Ok(())
    }
}

async fn record_status(engine: &Engine, record: TaskRecord, path: PathBuf) -> Result<RecordStatus> {
    let mut ctx = engine.context(record.id.clone(), path.clone())?;
    let preview = engine.preview(&mut ctx, &record).await?;
    ctx.end_chain();
    let signal = check(engine.store(), &record, &path)?;
    Ok(RecordStatus {
        record: record.id.to_string(),
        title: record.title,
        panel: path,
        signal,
        pending_changes: preview.changes.len(),
        conflicts: preview.conflicts.len(),
        warnings: preview.warnings.len(),
        updated_at: record.updated_at,
    })
}

fn print_table(rows: Vec<RecordStatus>) {
    println!(
        "taskpanel v{} | {} records",
        env!("CARGO_PKG_VERSION"),
        rows.len()
    );
    if rows.is_empty() {
        println!("No records. Run `taskpanel init <id> --title <title>` first.");
        return;
    }

    let needs_apply = rows
        .iter()
        .any(|r| matches!(r.signal, PanelSignal::Edited | PanelSignal::Behind { .. }));
    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            status: format!("{} {}", signal_indicator(&row.signal), row.signal.label().to_uppercase()),
            detail: signal_detail(&row),
            pending: row.pending_changes,
            updated: format_datetime_age(row.updated_at),
            record: row.record,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if needs_apply {
        println!("Run 'taskpanel apply <id>' to fold panel edits into the record.");
    }
}

fn signal_indicator(signal: &PanelSignal) -> String {
    match signal {
        PanelSignal::NeverRendered => "■".bright_black().bold().to_string(),
        PanelSignal::Missing => "■".magenta().bold().to_string(),
        PanelSignal::Behind { .. } => "■".yellow().bold().to_string(),
        PanelSignal::Edited => "■".red().bold().to_string(),
        PanelSignal::Current => "■".green().bold().to_string(),
    }
}

fn signal_detail(row: &RecordStatus) -> String {
    match &row.signal {
        PanelSignal::NeverRendered => "no panel rendered yet".to_string(),
        PanelSignal::Missing => format!("{} not found", row.panel.display()),
        PanelSignal::Behind { reason } => reason.clone(),
        PanelSignal::Edited => format!(
            "{} edit(s), {} conflict(s), {} warning(s)",
            row.pending_changes, row.conflicts, row.warnings
        ),
        PanelSignal::Current => "up to date".to_string(),
    }
}
