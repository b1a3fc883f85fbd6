//! tock CLI - offline-first time tracking from the terminal
//!
//! Every change lands in the local replica first and is reconciled with the
//! configured server when it is reachable.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tock_core::config::ClientConfig;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_db_path, AppContext};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::log::run_log;
use crate::commands::project::run_project;
use crate::commands::report::run_report;
use crate::commands::sync::run_sync;
use crate::commands::task::run_task;
use crate::commands::timer::run_timer;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "tock=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config)?;

    let command = match cli.command {
        Commands::Config { command } => return run_config(command, &config_path),
        Commands::Completions { shell, output } => {
            return run_completions(shell, output.as_deref());
        }
        command => command,
    };

    let config = ClientConfig::load(&config_path)?;
    let db_path = resolve_db_path(cli.db_path)?;
    let ctx = AppContext::open(&db_path, config, cli.offline, cli.no_sync).await?;

    match command {
        Commands::Project { command } => run_project(command, &ctx).await?,
        Commands::Task { command } => run_task(command, &ctx).await?,
        Commands::Timer { command } => run_timer(command, &ctx).await?,
        Commands::Log { command } => run_log(command, &ctx).await?,
        Commands::Report {
            from,
            to,
            group_by,
            json,
        } => run_report(from.as_deref(), to.as_deref(), group_by, json, &ctx).await?,
        Commands::Sync {
            push_only,
            pull_only,
        } => run_sync(push_only, pull_only, &ctx).await?,
        // Handled before the store is opened
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}
