// src/commands/uninstall.rs

//! Uninstall command

use super::CommandContext;
use anyhow::{Context, Result};

pub fn cmd_uninstall(ctx: &CommandContext, name: &str) -> Result<()> {
    let installer = ctx.installer(ctx.installer_config())?;
    let report = installer
        .uninstall(name)
        .with_context(|| format!("Failed to uninstall {}", name))?;

    println!("Removed {} {}", report.name, report.version);
    for path in &report.removed {
        println!("  {}", path.display());
    }
    Ok(())
}
