// src/formula/mod.rs

//! Formulas: declarative recipes for installing one release of a tool
//!
//! A formula names a source archive, the digest it must hash to, the tools
//! that have to be present to build it, and a short install procedure that
//! runs inside the unpacked source tree.
//!
//! # Example Formula
//!
//! ```toml
//! [package]
//! name = "logformat"
//! description = "Simply log formatting tool"
//! homepage = "https://github.com/chpi7/logformat"
//! version = "0.0.1"
//! license = "MIT"
//!
//! [source]
//! url = "https://github.com/chpi7/logformat/archive/refs/tags/0.0.1.tar.gz"
//! sha256 = "5839f84c5c1e98b08647d2eec3706bc2fb6218712887ea0858fa2f557cc5bc34"
//!
//! [[depends_on]]
//! name = "rust"
//! phase = "build"
//!
//! [[install]]
//! system = ["cargo", "build", "--release", "--bin", "logformat"]
//!
//! [[install]]
//! bin = "target/release/logformat"
//! ```
//!
//! Formulas are immutable once published: a new release is a new
//! `version`/`url`/`sha256` triple, never an edit of an existing one.

pub mod builtin;
mod format;
pub mod license;
pub mod parser;
mod repository;

pub use format::{
    BuildDependency, DependencyPhase, InstallStep, PackageFormula, PackageSection,
    ResolvedSource, SourceSection,
};
pub use parser::{parse_formula, parse_formula_file, validate_formula};
pub use repository::{FormulaOrigin, FormulaRepository};
