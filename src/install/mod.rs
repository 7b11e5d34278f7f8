// src/install/mod.rs

//! The install pipeline
//!
//! ```text
//! resolve -> dependencies -> fetch -> verify -> extract -> build
//!         -> stage -> place into <prefix>/bin -> record receipt
//! ```
//!
//! Each stage either succeeds or aborts the whole install. An aborted
//! install leaves no receipt and no file in the bin directory, so it is
//! indistinguishable from one that was never attempted.

mod build;
mod config;
mod plan;
mod stage;

pub use build::BuildLog;
pub use config::{InstallerConfig, absolute_prefix, default_prefix};
pub use plan::{InstallPlan, PlannedStep, plan};
pub use stage::BIN_MODE;

use crate::archive::extract_archive;
use crate::db::{self, models::Receipt, models::ReceiptFile};
use crate::dependencies::{
    DependencyReport, DependencyResolver, PathResolver, resolve_build_dependencies,
};
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, SchemeFetcher, SourceCache};
use crate::formula::{PackageFormula, validate_formula};
use crate::hash::{HashAlgorithm, hash_file};
use crate::lock::PrefixLock;
use stage::{Placement, stage_artifacts};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What an install left in the prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub name: String,
    pub version: String,
    /// Files in the bin directory owned by this install
    pub files: Vec<PathBuf>,
    pub dependencies: DependencyReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The pipeline ran and placed new files
    Installed(InstallReport),
    /// The same release was already installed and intact
    AlreadyInstalled(InstallReport),
}

impl InstallOutcome {
    pub fn report(&self) -> &InstallReport {
        match self {
            InstallOutcome::Installed(r) | InstallOutcome::AlreadyInstalled(r) => r,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.report().files
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, InstallOutcome::Installed(_))
    }
}

/// Result of checking an installed formula's files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub name: String,
    pub version: String,
    pub intact: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.modified.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub name: String,
    pub version: String,
    pub removed: Vec<PathBuf>,
}

/// Installs formulas into one prefix
pub struct Installer {
    config: InstallerConfig,
    resolver: Arc<dyn DependencyResolver>,
    fetcher: Arc<dyn Fetcher>,
}

impl Installer {
    /// Installer that fetches over the network and finds tools on `PATH`
    pub fn new(config: InstallerConfig) -> Result<Self> {
        let fetcher = SchemeFetcher::new(config.show_progress)?;
        Ok(Self::with_parts(
            config,
            Arc::new(PathResolver::new()),
            Arc::new(fetcher),
        ))
    }

    pub fn with_parts(
        config: InstallerConfig,
        resolver: Arc<dyn DependencyResolver>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            resolver,
            fetcher,
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    fn source_cache(&self) -> SourceCache<'_> {
        SourceCache::new(&self.config.source_cache, self.fetcher.as_ref())
    }

    /// Fetch and verify a formula's source archive into the cache
    pub fn fetch(&self, formula: &PackageFormula) -> Result<PathBuf> {
        let digest = formula.source.digest()?;
        self.source_cache()
            .fetch_and_verify(&formula.source.url, &digest)
    }

    /// Run the full pipeline for `formula`
    pub fn install(&self, formula: &PackageFormula) -> Result<InstallOutcome> {
        validate_formula(formula)?;
        let digest = formula.source.digest()?;
        let digest_text = digest.to_prefixed_string();
        let bin_dir = self.config.bin_dir();

        let _lock = self.lock_prefix()?;
        let mut conn = db::init(&self.config.db_path)?;

        let previous = Receipt::find_by_name(&conn, formula.name())?;
        if let Some(receipt) = &previous {
            if !self.config.force && receipt.matches(formula.version(), &digest_text) {
                if let Some(files) = intact_files(&conn, receipt)? {
                    info!("{} is already installed", formula.id());
                    return Ok(InstallOutcome::AlreadyInstalled(InstallReport {
                        name: receipt.name.clone(),
                        version: receipt.version.clone(),
                        files,
                        dependencies: DependencyReport::default(),
                    }));
                }
                warn!("{} is installed but damaged, reinstalling", formula.id());
            }
        }

        let planned_dests: Vec<PathBuf> = formula
            .installed_binaries()
            .into_iter()
            .map(|name| bin_dir.join(name))
            .collect();
        check_ownership(&conn, formula.name(), &planned_dests)?;

        let dependencies = resolve_build_dependencies(formula, self.resolver.as_ref())?;

        let archive = self
            .source_cache()
            .fetch_and_verify(&formula.source.url, &digest)?;

        let build_dir = self.build_dir(formula)?;
        let source_root = extract_archive(&archive, &build_dir.path().join("source"))?;
        if self.config.keep_builddir {
            info!("Keeping build directory {}", build_dir.path().display());
        }

        let install_plan = plan(formula, &source_root, &bin_dir)?;
        let mut build_log = BuildLog::new();
        let built = build_log.run_all(&install_plan);
        if let Err(e) = build_log.save(&build_dir.path().join("build.log")) {
            warn!("{}", e);
        }
        built?;

        let staged = stage_artifacts(&install_plan, &bin_dir)?;

        let previous_files: Vec<PathBuf> = match previous.as_ref().and_then(|r| r.id) {
            Some(id) => ReceiptFile::find_by_receipt(&conn, id)?
                .into_iter()
                .map(|f| PathBuf::from(f.path))
                .collect(),
            None => Vec::new(),
        };

        let mut placement = Placement::new();
        let committed = db::transaction(&mut conn, |tx| {
            if let Some(old) = &previous {
                if let Some(id) = old.id {
                    Receipt::delete(tx, id)?;
                }
            }

            let mut receipt = Receipt::new(
                formula.name().to_string(),
                formula.version().to_string(),
                formula.source.url.clone(),
                digest_text.clone(),
            );
            let receipt_id = receipt.insert(tx)?;

            for file in &staged {
                ReceiptFile::new(
                    receipt_id,
                    file.dest.to_string_lossy().to_string(),
                    file.sha256.clone(),
                    file.size as i64,
                    file.mode,
                )
                .insert(tx)?;
            }

            for file in staged {
                placement.place(file)?;
            }
            Ok(receipt)
        });

        let receipt = match committed {
            Ok(receipt) => receipt,
            Err(e) => {
                placement.rollback();
                return Err(e);
            }
        };

        let files = placement.placed().to_vec();
        placement.finish();

        remove_stale_files(&previous_files, &files);

        for file in &files {
            info!("Installed {}", file.display());
        }

        Ok(InstallOutcome::Installed(InstallReport {
            name: receipt.name,
            version: receipt.version,
            files,
            dependencies,
        }))
    }

    /// Take the prefix lock, saying so when another process holds it
    fn lock_prefix(&self) -> Result<PrefixLock> {
        if let Some(lock) = PrefixLock::try_acquire(&self.config.lock_path)? {
            return Ok(lock);
        }
        info!(
            "Waiting for lock on {} held by another formulary process",
            self.config.prefix.display()
        );
        PrefixLock::acquire(&self.config.lock_path)
    }

    fn build_dir(&self, formula: &PackageFormula) -> Result<tempfile::TempDir> {
        let prefix = format!("formulary-{}-", formula.id());
        let mut builder = tempfile::Builder::new();
        builder
            .prefix(&prefix)
            .disable_cleanup(self.config.keep_builddir);

        let dir = match &self.config.build_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| Error::IoError(format!("Failed to create build directory: {e}")))?;

        debug!("Build directory: {}", dir.path().display());
        Ok(dir)
    }

    /// Remove an installed formula's files and its receipt
    pub fn uninstall(&self, name: &str) -> Result<UninstallReport> {
        let _lock = self.lock_prefix()?;
        let mut conn = db::open(&self.config.db_path)?;

        let receipt = Receipt::find_by_name(&conn, name)?
            .ok_or_else(|| Error::NotFound(format!("{name} is not installed")))?;
        let receipt_id = receipt
            .id
            .ok_or_else(|| Error::NotFound(format!("{name} is not installed")))?;

        let mut removed = Vec::new();
        for file in ReceiptFile::find_by_receipt(&conn, receipt_id)? {
            let path = PathBuf::from(&file.path);
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("{} was already gone", path.display());
                }
                Err(e) => {
                    return Err(Error::InstallError(format!(
                        "cannot remove {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        db::transaction(&mut conn, |tx| Receipt::delete(tx, receipt_id))?;
        info!("Uninstalled {} {}", receipt.name, receipt.version);

        Ok(UninstallReport {
            name: receipt.name,
            version: receipt.version,
            removed,
        })
    }

    /// Re-hash an installed formula's files against its receipt
    pub fn verify(&self, name: &str) -> Result<VerifyReport> {
        let conn = db::open(&self.config.db_path)?;
        let receipt = Receipt::find_by_name(&conn, name)?
            .ok_or_else(|| Error::NotFound(format!("{name} is not installed")))?;

        let mut report = VerifyReport {
            name: receipt.name.clone(),
            version: receipt.version.clone(),
            ..Default::default()
        };

        for file in ReceiptFile::find_by_receipt(&conn, receipt.id.unwrap_or_default())? {
            let path = PathBuf::from(&file.path);
            match file_state(&path, &file.sha256)? {
                FileState::Intact => report.intact.push(path),
                FileState::Missing => report.missing.push(path),
                FileState::Modified => report.modified.push(path),
            }
        }

        Ok(report)
    }

    /// Receipts in this prefix; empty when nothing was ever installed
    pub fn list_installed(&self) -> Result<Vec<Receipt>> {
        if !self.config.db_path.exists() {
            return Ok(Vec::new());
        }
        let conn = db::open(&self.config.db_path)?;
        Receipt::list_all(&conn)
    }
}

enum FileState {
    Intact,
    Missing,
    Modified,
}

fn file_state(path: &Path, expected_sha256: &str) -> Result<FileState> {
    if !path.is_file() {
        return Ok(FileState::Missing);
    }
    if hash_file(HashAlgorithm::Sha256, path)?.value == expected_sha256 {
        Ok(FileState::Intact)
    } else {
        Ok(FileState::Modified)
    }
}

/// Recorded files of `receipt`, or `None` if any is missing or changed
fn intact_files(conn: &rusqlite::Connection, receipt: &Receipt) -> Result<Option<Vec<PathBuf>>> {
    let Some(id) = receipt.id else {
        return Ok(None);
    };

    let mut files = Vec::new();
    for file in ReceiptFile::find_by_receipt(conn, id)? {
        let path = PathBuf::from(&file.path);
        if !matches!(file_state(&path, &file.sha256)?, FileState::Intact) {
            return Ok(None);
        }
        files.push(path);
    }
    Ok(Some(files))
}

/// Refuse to touch files in `bin` that this formula does not own
fn check_ownership(conn: &rusqlite::Connection, name: &str, dests: &[PathBuf]) -> Result<()> {
    for dest in dests {
        let record = ReceiptFile::find_by_path(conn, &dest.to_string_lossy())?;
        let owner = match &record {
            Some(file) => receipt_name(conn, file.receipt_id)?,
            None => None,
        };

        match owner {
            Some(owner) if owner == name => {}
            Some(owner) => {
                return Err(Error::InstallError(format!(
                    "{} belongs to {}",
                    dest.display(),
                    owner
                )));
            }
            None if dest.exists() => {
                return Err(Error::InstallError(format!(
                    "{} already exists and was not installed by formulary",
                    dest.display()
                )));
            }
            None => {}
        }
    }
    Ok(())
}

fn receipt_name(conn: &rusqlite::Connection, receipt_id: i64) -> Result<Option<String>> {
    Ok(Receipt::find_by_id(conn, receipt_id)?.map(|r| r.name))
}

/// Delete files the previous release installed that the new one did not
fn remove_stale_files(previous: &[PathBuf], current: &[PathBuf]) {
    let keep: HashSet<&Path> = current.iter().map(PathBuf::as_path).collect();
    for path in previous.iter().filter(|p| !keep.contains(p.as_path())) {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove stale {}: {}", path.display(), e),
        }
    }
}
