// src/install/stage.rs

//! Staging built artifacts and placing them into the bin directory
//!
//! Artifacts are copied into hidden temporary files inside the bin
//! directory first, then renamed over their final names. A rename within
//! one directory is atomic, so a reader of `bin` sees either the old file
//! or the complete new one.

use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, hash_file};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use super::plan::InstallPlan;

/// Mode given to installed executables
pub const BIN_MODE: u32 = 0o755;

const STAGE_PREFIX: &str = ".formulary-stage-";
const BACKUP_PREFIX: &str = ".formulary-backup-";

/// An artifact copied next to its destination, not yet visible
pub struct StagedFile {
    temp: NamedTempFile,
    pub dest: PathBuf,
    pub sha256: String,
    pub size: u64,
    pub mode: u32,
}

/// Copy every artifact of `plan` into a hidden file in `bin_dir`
///
/// Fails with `InstallError` if the build did not produce an artifact or
/// the bin directory cannot be written. Staged files vanish on drop.
pub fn stage_artifacts(plan: &InstallPlan, bin_dir: &Path) -> Result<Vec<StagedFile>> {
    let copies = plan.copies();

    for (source, _) in &copies {
        if !source.is_file() {
            return Err(Error::InstallError(format!(
                "build did not produce {}",
                source.display()
            )));
        }
    }

    fs::create_dir_all(bin_dir).map_err(|e| {
        Error::InstallError(format!("cannot create {}: {}", bin_dir.display(), e))
    })?;

    copies
        .into_iter()
        .map(|(source, dest)| stage_one(source, dest, bin_dir))
        .collect()
}

fn stage_one(source: &Path, dest: &Path, bin_dir: &Path) -> Result<StagedFile> {
    let write_error =
        |e: io::Error| Error::InstallError(format!("cannot write to {}: {}", bin_dir.display(), e));

    let mut temp = tempfile::Builder::new()
        .prefix(STAGE_PREFIX)
        .tempfile_in(bin_dir)
        .map_err(write_error)?;

    let mut input = File::open(source)?;
    let size = io::copy(&mut input, temp.as_file_mut()).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    set_executable(temp.path()).map_err(write_error)?;

    let sha256 = hash_file(HashAlgorithm::Sha256, temp.path())?.value;
    debug!("Staged {} -> {}", source.display(), dest.display());

    Ok(StagedFile {
        temp,
        dest: dest.to_path_buf(),
        sha256,
        size,
        mode: BIN_MODE,
    })
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(BIN_MODE))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Files moved into place by one install, undoable until `finish`
#[derive(Default)]
pub struct Placement {
    placed: Vec<PathBuf>,
    backups: Vec<(TempPath, PathBuf)>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename a staged file over its destination
    ///
    /// An existing destination is moved aside first so `rollback` can
    /// restore it.
    pub fn place(&mut self, staged: StagedFile) -> Result<PathBuf> {
        let bin_dir = staged
            .dest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if staged.dest.exists() {
            let backup = tempfile::Builder::new()
                .prefix(BACKUP_PREFIX)
                .tempfile_in(&bin_dir)?
                .into_temp_path();
            fs::rename(&staged.dest, &backup)?;
            self.backups.push((backup, staged.dest.clone()));
        }

        let dest = staged.dest.clone();
        staged.temp.persist(&dest).map_err(|e| {
            Error::InstallError(format!("cannot install {}: {}", dest.display(), e.error))
        })?;
        self.placed.push(dest.clone());
        Ok(dest)
    }

    pub fn placed(&self) -> &[PathBuf] {
        &self.placed
    }

    /// Remove what was placed and put any previous files back
    pub fn rollback(self) {
        for path in &self.placed {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
        for (backup, original) in self.backups {
            if let Err(e) = fs::rename(&backup, &original) {
                warn!("Failed to restore {}: {}", original.display(), e);
            }
        }
    }

    /// Keep the new files and discard the backups
    pub fn finish(self) {
        for (backup, _) in self.backups {
            if let Err(e) = backup.close() {
                debug!("Failed to remove backup: {}", e);
            }
        }
    }
}
