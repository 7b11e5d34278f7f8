// src/commands/formula.rs

//! Formula inspection commands

use super::CommandContext;
use anyhow::{Context, Result};
use formulary::formula::{FormulaOrigin, validate_formula};

/// Show a formula's metadata and resolved source
pub fn cmd_info(ctx: &CommandContext, reference: &str, json: bool) -> Result<()> {
    let repo = ctx.repository()?;
    let formula = repo
        .load_formula(reference)
        .with_context(|| format!("Failed to load formula {}", reference))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&formula)?);
        return Ok(());
    }

    let source = formula.resolve();
    println!("{} {}", formula.name(), formula.version());
    println!("  {}", formula.package.description);
    if let Some(homepage) = &formula.package.homepage {
        println!("  Homepage: {}", homepage);
    }
    println!("  License:  {}", formula.package.license);
    println!("  Source:   {}", source.source_url);
    println!("  Digest:   {}", source.integrity_digest);
    match repo.origin(formula.name()) {
        Some(FormulaOrigin::Builtin) => println!("  Origin:   built-in"),
        Some(FormulaOrigin::File(path)) => println!("  Origin:   {}", path.display()),
        None => println!("  Origin:   {}", reference),
    }

    if !formula.depends_on.is_empty() {
        println!("\nDependencies:");
        for dep in &formula.depends_on {
            println!("  - {}", dep);
        }
    }

    println!("\nInstall procedure:");
    for (i, step) in formula.install.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }

    Ok(())
}

/// Validate a formula and report warnings
pub fn cmd_validate(ctx: &CommandContext, reference: &str) -> Result<()> {
    let repo = ctx.repository()?;
    let formula = repo
        .load_formula(reference)
        .with_context(|| format!("Failed to load formula {}", reference))?;

    let warnings = validate_formula(&formula)
        .with_context(|| format!("Formula {} is invalid", formula.id()))?;

    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    if warnings.is_empty() {
        println!("[OK] {} has no issues", formula.id());
    } else {
        println!("[OK] {} is valid with {} warning(s)", formula.id(), warnings.len());
    }
    Ok(())
}

/// List formulas matching a query
pub fn cmd_search(ctx: &CommandContext, query: Option<&str>) -> Result<()> {
    let repo = ctx.repository()?;
    let matches = repo.search(query.unwrap_or(""));

    if matches.is_empty() {
        println!("No formulas found.");
        return Ok(());
    }

    for formula in matches {
        println!(
            "{:<20} {:<10} {}",
            formula.name(),
            formula.version(),
            formula.package.description
        );
    }
    Ok(())
}
