//! constcache CLI - query constant tables through the load-once cache
//!
//! The binary loads fixture tables into an in-memory store, registers the
//! configured entities and answers one lookup per invocation.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod context;
mod output;
mod utils;

use crate::cli::{Cli, Commands};
use crate::context::Context;
use crate::utils::initialize_logging;

/// Execute the constcache CLI with the currently configured environment.
///
/// # Errors
///
/// Returns an error if initialization or command execution fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let ctx = Context::build(cli.fixtures.as_deref(), cli.config.as_deref())?;
    execute_command(&ctx, cli.command, cli.format).await?;

    debug!(queries = ctx.store.query_count(), "store queries issued");
    Ok(())
}

async fn execute_command(
    ctx: &Context,
    command: Commands,
    format: output::OutputFormat,
) -> Result<()> {
    use constcache_core::Selector;

    let registry = &ctx.registry;
    match command {
        Commands::Find { entity, ids } => {
            let selector = commands::key_selector(&ids);
            commands::find(registry, &entity, &selector, format).await?;
        },
        Commands::All { entity } => {
            commands::find(registry, &entity, &Selector::All, format).await?;
        },
        Commands::First { entity } => {
            commands::find(registry, &entity, &Selector::First, format).await?;
        },
        Commands::Last { entity } => {
            commands::find(registry, &entity, &Selector::Last, format).await?;
        },
        Commands::Named { entity, name } => {
            commands::invoke_named(registry, &entity, &name, format).await?;
        },
        Commands::Accessors { entity } => {
            commands::list_accessors(registry, &entity, format).await?;
        },
        Commands::Where { entity, conditions } => {
            commands::find_where(registry, &entity, &conditions, format).await?;
        },
        Commands::Stats { entity, ids } => {
            commands::show_stats(registry, &entity, &ids, format).await?;
        },
    }
    Ok(())
}
