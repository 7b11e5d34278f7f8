// src/error.rs

//! Error types for formulary
//!
//! Every stage of the install pipeline maps its failures onto one variant
//! here so callers can tell a network outage from a tampered archive from a
//! broken build without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Source archive could not be fetched
    #[error("network error: {0}")]
    NetworkError(String),

    /// Fetched bytes do not match the formula's digest
    #[error("integrity check failed for {url}: expected {expected}, got {actual}")]
    IntegrityError {
        url: String,
        expected: String,
        actual: String,
    },

    /// A declared build dependency is missing and could not be installed
    #[error("dependency error: {0}")]
    DependencyError(String),

    /// A build step could not be spawned or exited non-zero
    #[error("build step `{step}` failed ({status}){}", format_stderr(.stderr))]
    BuildError {
        step: String,
        status: String,
        stderr: String,
    },

    /// The built artifact is missing or the destination cannot be written
    #[error("install error: {0}")]
    InstallError(String),

    /// Formula or digest text could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Formula parsed but violates an invariant
    #[error("invalid formula: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Archive layout or format problem
    #[error("archive error in {path}: {message}")]
    ArchiveError { path: PathBuf, message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure with extra context
    #[error("I/O error: {0}")]
    IoError(String),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nstderr:\n{trimmed}")
    }
}
