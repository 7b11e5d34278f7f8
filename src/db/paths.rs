// src/db/paths.rs
//! Centralized path derivation for a formulary prefix

use std::path::{Path, PathBuf};

/// Directory installed executables go into
pub fn bin_dir(prefix: &Path) -> PathBuf {
    prefix.join("bin")
}

/// Directory holding the registry database
pub fn state_dir(prefix: &Path) -> PathBuf {
    prefix.join("var/lib/formulary")
}

/// Registry database path
pub fn db_path(prefix: &Path) -> PathBuf {
    state_dir(prefix).join("formulary.db")
}

/// Lock file serializing operations on the prefix
pub fn lock_path(prefix: &Path) -> PathBuf {
    state_dir(prefix).join("formulary.lock")
}

/// Verified source archive cache
///
/// `FORMULARY_CACHE_DIR` overrides the per-prefix location.
pub fn source_cache_dir(prefix: &Path) -> PathBuf {
    std::env::var_os("FORMULARY_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| prefix.join("var/cache/formulary/sources"))
}

/// Parent for temporary build directories
pub fn build_dir(prefix: &Path) -> PathBuf {
    prefix.join("var/tmp/formulary")
}
