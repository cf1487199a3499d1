//! taskpanel — task records with a hand-editable Markdown panel.
//!
//! # Usage
//!
//! ```text
//! taskpanel init <id> --title <title>
//! taskpanel render <id> [--doc <path>]
//! taskpanel preview <id> [--json]
//! taskpanel apply <id> [--json]
//! taskpanel status [<id>] [--json]
//! taskpanel diff <id>
//! taskpanel plan add <id> <description>
//! taskpanel step add <id> <plan> <description>
//! taskpanel evr add <id> <title> [--class static|runtime] [--verify ..] [--expect ..]
//! taskpanel set-status <id> <node> <status>
//! taskpanel evr-status <id> <evr> <status> [--proof ..]
//! taskpanel log <id> <message>
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs,
    edit::{EvrCommand, EvrStatusArgs, LogArgs, PlanCommand, SetStatusArgs, StepCommand},
    init::InitArgs,
    reconcile::{ApplyArgs, PreviewArgs, RenderArgs},
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "taskpanel",
    version,
    about = "Keep structured task records and their Markdown panels in sync",
    long_about = None,
)]
struct Cli {
    /// Log reconciliation activity to stderr (same as RUST_LOG=info).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a record and render its panel.
    Init(InitArgs),

    /// Reconcile pending panel edits and re-render the panel.
    Render(RenderArgs),

    /// Show what reconciling the panel would change, without writing.
    Preview(PreviewArgs),

    /// Fold panel edits into the record and re-render.
    Apply(ApplyArgs),

    /// Show how each panel relates to its record.
    Status(StatusArgs),

    /// Show a unified diff between the panel on disk and a fresh render.
    Diff(DiffArgs),

    /// Manage plans.
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },

    /// Manage steps.
    Step {
        #[command(subcommand)]
        command: StepCommand,
    },

    /// Manage expected results.
    Evr {
        #[command(subcommand)]
        command: EvrCommand,
    },

    /// Set the status of a plan or step.
    SetStatus(SetStatusArgs),

    /// Record a verification run for an expected result.
    EvrStatus(EvrStatusArgs),

    /// Append a log entry.
    Log(LogArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(cli.command))
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Init(args) => args.run().await,
        Commands::Render(args) => args.run().await,
        Commands::Preview(args) => args.run().await,
        Commands::Apply(args) => args.run().await,
        Commands::Status(args) => args.run().await,
        Commands::Diff(args) => args.run().await,
        Commands::Plan { command } => commands::edit::run_plan(command).await,
        Commands::Step { command } => commands::edit::run_step(command).await,
        Commands::Evr { command } => commands::edit::run_evr(command).await,
        Commands::SetStatus(args) => args.run().await,
        Commands::EvrStatus(args) => args.run().await,
        Commands::Log(args) => args.run().await,
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
