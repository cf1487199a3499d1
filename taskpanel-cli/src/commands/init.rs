//! `taskpanel init <id> --title <title>`

use anyhow::{Context, Result};
use clap::Args;

use taskpanel_core::{store, TaskRecord};

use super::{home, open, RecordArgs};

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    /// Record title; also the panel's `#` heading.
    #[arg(long, short = 't')]
    pub title: String,
}

impl InitArgs {
    pub async fn run(self) -> Result<()> {
        let id = self.record.record_id();
        TaskRecord::new(id.clone(), self.title.as_str())
            .validate()
            .with_context(|| format!("invalid record '{id}'"))?;

        let home = home()?;
        let existed = store::record_path_at(&home, &id).exists();
        let record = store::init_record_at(&home, id.clone(), &self.title)
            .with_context(|| format!("failed to create record '{id}'"))?;

        let (engine, mut ctx) = open(&self.record)?;
        let write = engine
            .render_panel(&mut ctx)
            .await
            .with_context(|| format!("failed to render panel for '{id}'"))?;

        if existed {
            println!("✓ Record '{}' already exists ({})", record.id, record.title);
        } else {
            println!("✓ Created record '{}' ({})", record.id, record.title);
        }
        let state = if write.was_written() { "written" } else { "unchanged" };
        println!("  Panel: {} ({state})", ctx.path().display());
        Ok(())
    }
}
