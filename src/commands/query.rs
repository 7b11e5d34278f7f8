// src/commands/query.rs

//! Commands that read the installed-package registry

use super::CommandContext;
use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;

/// Format a SQLite `CURRENT_TIMESTAMP` for display
fn format_installed_at(raw: Option<&str>) -> String {
    raw.and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// List installed formulas
pub fn cmd_list(ctx: &CommandContext, json: bool) -> Result<()> {
    let installer = ctx.installer(ctx.installer_config())?;
    let receipts = installer
        .list_installed()
        .context("Failed to read installed formulas")?;

    if json {
        let entries: Vec<serde_json::Value> = receipts
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "version": r.version,
                    "source_url": r.source_url,
                    "digest": r.digest,
                    "installed_at": r.installed_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if receipts.is_empty() {
        println!("Nothing installed in {}", ctx.prefix.display());
        return Ok(());
    }

    for receipt in &receipts {
        println!(
            "{:<20} {:<10} {}",
            receipt.name,
            receipt.version,
            format_installed_at(receipt.installed_at.as_deref())
        );
    }
    Ok(())
}

/// Check an installed formula's files
pub fn cmd_verify(ctx: &CommandContext, name: &str) -> Result<()> {
    let installer = ctx.installer(ctx.installer_config())?;
    let report = installer
        .verify(name)
        .with_context(|| format!("Failed to verify {}", name))?;

    for path in &report.intact {
        println!("  [OK]       {}", path.display());
    }
    for path in &report.modified {
        println!("  [MODIFIED] {}", path.display());
    }
    for path in &report.missing {
        println!("  [MISSING]  {}", path.display());
    }

    if !report.is_clean() {
        bail!(
            "{} {}: {} modified, {} missing",
            report.name,
            report.version,
            report.modified.len(),
            report.missing.len()
        );
    }

    println!("{} {} verified", report.name, report.version);
    Ok(())
}
