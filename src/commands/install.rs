// src/commands/install.rs

//! Fetch and install commands

use super::CommandContext;
use anyhow::{Context, Result};
use formulary::InstallOutcome;
use tracing::info;

/// Download and verify a formula's source into the cache
pub fn cmd_fetch(ctx: &CommandContext, reference: &str) -> Result<()> {
    let formula = ctx
        .repository()?
        .load_formula(reference)
        .with_context(|| format!("Failed to load formula {}", reference))?;

    let installer = ctx.installer(ctx.installer_config())?;
    let path = installer
        .fetch(&formula)
        .with_context(|| format!("Failed to fetch source for {}", formula.id()))?;

    println!("[OK] Verified {} source", formula.id());
    println!("  {}", path.display());
    Ok(())
}

/// Run the full install pipeline for a formula
pub fn cmd_install(
    ctx: &CommandContext,
    reference: &str,
    force: bool,
    keep_builddir: bool,
) -> Result<()> {
    let formula = ctx
        .repository()?
        .load_formula(reference)
        .with_context(|| format!("Failed to load formula {}", reference))?;

    let config = ctx
        .installer_config()
        .with_force(force)
        .with_keep_builddir(keep_builddir);
    let installer = ctx.installer(config)?;

    println!("Installing {}...", formula.id());
    let outcome = installer
        .install(&formula)
        .with_context(|| format!("Failed to install {}", formula.id()))?;

    match &outcome {
        InstallOutcome::Installed(report) => {
            for dep in &report.dependencies.newly_installed {
                println!("  Installed dependency {}", dep);
            }
            println!("\n[COMPLETE] Installed {} {}", report.name, report.version);
        }
        InstallOutcome::AlreadyInstalled(report) => {
            println!(
                "{} {} is already installed (use --force to reinstall)",
                report.name, report.version
            );
        }
    }

    for file in outcome.files() {
        println!("  {}", file.display());
    }

    info!("Install of {} finished", formula.id());
    Ok(())
}
