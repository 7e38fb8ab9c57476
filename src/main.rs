//! `sentry-frames`: query the Sentry REST API and print dashboard frames.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use sentry_frames::cli_args::{
    BatchArgs, GlobalArgs, IssuesArgs, OrganizationsArgs, ProjectsArgs, StatsArgs,
};
use sentry_frames::config::load_global;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "sentry-frames",
    about = "Query the Sentry REST API and print tabular frames",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List organizations visible to the token
    Organizations(OrganizationsArgs),
    /// List an organization's projects
    Projects(ProjectsArgs),
    /// List an organization's issues within a time range
    Issues(IssuesArgs),
    /// Show an organization's usage statistics
    Stats(StatsArgs),
    /// Run a JSON batch of dashboard queries
    Batch(BatchArgs),
}

/// Cancel `token` on Ctrl-C so in-flight requests are abandoned.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted, cancelling requests");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let global = load_global(cli.global).context("configuration error")?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    match cli.command {
        Commands::Organizations(args) => {
            commands::run_organizations(args, &global, &cancel).await
        }
        Commands::Projects(args) => commands::run_projects(args, &global, &cancel).await,
        Commands::Issues(args) => commands::run_issues(args, &global, &cancel).await,
        Commands::Stats(args) => commands::run_stats(args, &global, &cancel).await,
        Commands::Batch(args) => commands::run_batch(args, &global, &cancel).await,
    }
}
