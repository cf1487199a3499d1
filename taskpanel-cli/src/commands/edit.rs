//! Structured-record edits: `plan add`, `step add`, `evr add`, `set-status`,
//! `evr-status`, `log`.
//!
//! Each command reconciles pending panel edits first, then applies its own
//! change through [`SyncEngine::mutate`](taskpanel_sync::SyncEngine::mutate).

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use taskpanel_core::{EvrClass, EvrId, EvrStatus, NodeId, PlanStatus, TaskRecord};
use taskpanel_sync::{Mutation, SyncError};

use super::{open, reconcile::print_preview, RecordArgs};

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Append a plan in `to_do` state.
    Add {
        #[command(flatten)]
        record: RecordArgs,
        description: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum StepCommand {
    /// Append a step under a plan.
    Add {
        #[command(flatten)]
        record: RecordArgs,
        /// Parent plan id, e.g. `P1`.
        plan: String,
        description: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvrCommand {
    /// Add an expected result.
    Add {
        #[command(flatten)]
        record: RecordArgs,
        title: String,
        /// `static` or `runtime`.
        #[arg(long, default_value = "static")]
        class: EvrClass,
        /// Verification command or procedure (repeatable).
        #[arg(long)]
        verify: Vec<String>,
        /// Expected outcome (repeatable).
        #[arg(long)]
        expect: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct SetStatusArgs {
    #[command(flatten)]
    pub record: RecordArgs,
    /// Plan or step id, e.g. `P1` or `P1.S2`.
    pub node: String,
    /// to_do, in_progress, completed or blocked.
    pub status: PlanStatus,
}

#[derive(Args, Debug)]
pub struct EvrStatusArgs {
    #[command(flatten)]
    pub record: RecordArgs,
    /// Expected result id, e.g. `E1`.
    pub evr: String,
    /// unknown, passing or failing.
    pub status: EvrStatus,
    /// Evidence for the run (log excerpt, link, ...).
    #[arg(long)]
    pub proof: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(flatten)]
    pub record: RecordArgs,
    pub message: String,
}

pub async fn run_plan(command: PlanCommand) -> Result<()> {
    match command {
        PlanCommand::Add {
            record,
            description,
        } => {
            let mutation = mutate(&record, |r| Ok(r.add_plan(description))).await?;
            report(&format!("Added plan {}", mutation.value), &mutation);
            Ok(())
        }
    }
}

pub async fn run_step(command: StepCommand) -> Result<()> {
    match command {
        StepCommand::Add {
            record,
            plan,
            description,
        } => {
            let plan = NodeId::from(plan.as_str());
            let mutation = mutate(&record, |r| Ok(r.add_step(&plan, description)?)).await?;
            report(&format!("Added step {}", mutation.value), &mutation);
            Ok(())
        }
    }
}

pub async fn run_evr(command: EvrCommand) -> Result<()> {
    match command {
        EvrCommand::Add {
            record,
            title,
            class,
            verify,
            expect,
        } => {
            let mutation = mutate(&record, |r| {
                let id = r.add_evr(title, class);
                if let Some(evr) = r.evr_mut(&id) {
                    evr.verify = verify;
                    evr.expect = expect;
                }
                Ok(id)
            })
            .await?;
            report(&format!("Added expected result {}", mutation.value), &mutation);
            Ok(())
        }
    }
}

impl SetStatusArgs {
    pub async fn run(self) -> Result<()> {
        let node = NodeId::from(self.node.as_str());
        let status = self.status;
        let mutation = mutate(&self.record, |r| Ok(r.set_status(&node, status)?)).await?;
        report(
            &format!("{node}: {} → {status}", mutation.value),
            &mutation,
        );
        Ok(())
    }
}

impl EvrStatusArgs {
    pub async fn run(self) -> Result<()> {
        let evr = EvrId::from(self.evr.as_str());
        let status = self.status;
        let proof = self.proof;
        let mutation = mutate(&self.record, |r| Ok(r.set_evr_status(&evr, status, proof)?)).await?;
        report(&format!("{evr}: {status}"), &mutation);
        Ok(())
    }
}

impl LogArgs {
    pub async fn run(self) -> Result<()> {
        let message = self.message;
        let mutation = mutate(&self.record, |r| {
            r.append_log(message);
            Ok(())
        })
        .await?;
        report("Logged", &mutation);
        Ok(())
    }
}

async fn mutate<T, F>(args: &RecordArgs, f: F) -> Result<Mutation<T>>
where
    F: FnOnce(&mut TaskRecord) -> Result<T, SyncError>,
{
    let (engine, mut ctx) = open(args)?;
    let mutation = engine
        .mutate(&mut ctx, f)
        .await
        .with_context(|| format!("update failed for '{}'", args.id))?;
    ctx.end_chain();
    Ok(mutation)
}

fn report<T>(summary: &str, mutation: &Mutation<T>) {
    println!("{} {summary}", "✓".green().bold());
    if !mutation.preview.is_clean() {
        println!("Reconciled panel edits first:");
        print_preview(&mutation.preview);
    }
}
