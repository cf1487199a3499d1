//! `taskpanel diff <id>` — unified diff between the panel and a fresh render.

use anyhow::{Context, Result};
use clap::Args;

use taskpanel_sync::diff::diff_panel;

use super::{open, RecordArgs};

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub record: RecordArgs,
}

impl DiffArgs {
    pub async fn run(self) -> Result<()> {
        let (engine, mut ctx) = open(&self.record)?;
        let (record, _) = engine
            .load(&mut ctx)
            .await
            .with_context(|| format!("failed to load '{}'", self.record.id))?;
        ctx.end_chain();

        let diff = diff_panel(engine.store(), &record, ctx.path())
            .with_context(|| format!("diff failed for '{}'", self.record.id))?;
        let Some(diff) = diff else {
            println!("No differences for '{}'.", self.record.id);
            return Ok(());
        };
        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
