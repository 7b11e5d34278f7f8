// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::CommandContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose {
        "debug"
    } else if cli.global.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext::from_args(&cli.global);

    match cli.command {
        Commands::Info { formula, json } => commands::cmd_info(&ctx, &formula, json),
        Commands::Validate { formula } => commands::cmd_validate(&ctx, &formula),
        Commands::Fetch { formula } => commands::cmd_fetch(&ctx, &formula),
        Commands::Install {
            formula,
            force,
            keep_builddir,
        } => commands::cmd_install(&ctx, &formula, force, keep_builddir),
        Commands::Uninstall { name } => commands::cmd_uninstall(&ctx, &name),
        Commands::List { json } => commands::cmd_list(&ctx, json),
        Commands::Verify { name } => commands::cmd_verify(&ctx, &name),
        Commands::Search { query } => commands::cmd_search(&ctx, query.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "formulary", &mut std::io::stdout());
            Ok(())
        }
    }
}
