// src/cli/mod.rs
//! CLI definitions for formulary
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formulary")]
#[command(author = "Formulary Contributors")]
#[command(version)]
#[command(about = "Install command-line tools from verified source formulas", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Installation prefix (executables go to <PREFIX>/bin)
    #[arg(long, global = true, env = "FORMULARY_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Extra directory of *.toml formulas
    #[arg(long, global = true, env = "FORMULARY_FORMULA_DIR")]
    pub formula_dir: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a formula's metadata and resolved source
    Info {
        /// Formula name or path to a .toml formula
        formula: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a formula for errors and warnings
    Validate {
        /// Formula name or path to a .toml formula
        formula: String,
    },

    /// Download and verify a formula's source archive
    Fetch {
        /// Formula name or path to a .toml formula
        formula: String,
    },

    /// Fetch, verify, build and install a formula
    Install {
        /// Formula name or path to a .toml formula
        formula: String,

        /// Reinstall even if this release is already installed
        #[arg(short, long)]
        force: bool,

        /// Keep the build directory (for debugging)
        #[arg(long)]
        keep_builddir: bool,
    },

    /// Remove an installed formula
    Uninstall {
        /// Installed formula name
        name: String,
    },

    /// List installed formulas
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check installed files against their recorded hashes
    Verify {
        /// Installed formula name
        name: String,
    },

    /// Search available formulas
    Search {
        /// Substring of a name or description (lists everything if omitted)
        query: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}
