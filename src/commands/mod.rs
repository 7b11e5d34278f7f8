// src/commands/mod.rs
//! Command handlers for the formulary CLI

mod formula;
mod install;
mod query;
mod uninstall;

pub use formula::{cmd_info, cmd_search, cmd_validate};
pub use install::{cmd_fetch, cmd_install};
pub use query::{cmd_list, cmd_verify};
pub use uninstall::cmd_uninstall;

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use formulary::install::{absolute_prefix, default_prefix};
use formulary::{FormulaRepository, Installer, InstallerConfig};
use std::path::PathBuf;

/// Settings shared by every command
pub struct CommandContext {
    pub prefix: PathBuf,
    pub formula_dir: Option<PathBuf>,
    pub show_progress: bool,
}

impl CommandContext {
    pub fn from_args(global: &GlobalArgs) -> Self {
        Self {
            prefix: absolute_prefix(&global.prefix.clone().unwrap_or_else(default_prefix)),
            formula_dir: global.formula_dir.clone(),
            show_progress: !global.quiet,
        }
    }

    pub fn repository(&self) -> Result<FormulaRepository> {
        FormulaRepository::open(self.formula_dir.as_deref()).with_context(|| match &self.formula_dir {
            Some(dir) => format!("Failed to load formulas from {}", dir.display()),
            None => "Failed to load built-in formulas".to_string(),
        })
    }

    pub fn installer_config(&self) -> InstallerConfig {
        InstallerConfig::for_prefix(&self.prefix).with_progress(self.show_progress)
    }

    pub fn installer(&self, config: InstallerConfig) -> Result<Installer> {
        Installer::new(config).context("Failed to set up installer")
    }
}
