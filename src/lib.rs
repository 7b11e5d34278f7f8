// src/lib.rs

//! Formulary: formula-driven source installer
//!
//! A formula pins one release of a command-line tool: its source archive,
//! the digest that archive must hash to, the tools needed to build it, and
//! the steps that turn the unpacked source into an executable under the
//! prefix's `bin` directory.
//!
//! # Architecture
//!
//! - Formulas are immutable values; the installer owns all state
//! - Verify before build: nothing runs until the archive matches its digest
//! - All-or-nothing installs: a failed install leaves no files and no receipt
//! - Installed files are tracked in SQLite with their SHA-256 hashes

pub mod archive;
pub mod db;
pub mod dependencies;
mod error;
pub mod fetch;
pub mod formula;
pub mod hash;
pub mod install;
pub mod lock;

pub use dependencies::{DependencyReport, DependencyResolver, NoopResolver, PathResolver};
pub use error::{Error, Result};
pub use fetch::{Fetcher, SourceCache};
pub use formula::{
    BuildDependency, DependencyPhase, FormulaRepository, InstallStep, PackageFormula,
    ResolvedSource,
};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use install::{
    InstallOutcome, InstallPlan, InstallReport, Installer, InstallerConfig, PlannedStep,
    UninstallReport, VerifyReport,
};
