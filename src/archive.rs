// src/archive.rs

//! Source archive extraction

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive formats we can unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Detect from the file name, falling back to the gzip magic bytes
    pub fn detect(path: &Path) -> Result<Self> {
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            return Ok(Self::TarGz);
        }
        if filename.ends_with(".tar") {
            return Ok(Self::Tar);
        }

        // Cached sources are named by digest, so sniff the content
        let mut magic = [0u8; 2];
        let mut file = File::open(path)?;
        if file.read_exact(&mut magic).is_ok() && magic == [0x1f, 0x8b] {
            return Ok(Self::TarGz);
        }

        let mut header = [0u8; 262];
        let mut file = File::open(path)?;
        if file.read_exact(&mut header).is_ok() && &header[257..262] == b"ustar" {
            return Ok(Self::Tar);
        }

        Err(Error::ArchiveError {
            path: path.to_path_buf(),
            message: "unknown archive format (supported: .tar.gz, .tgz, .tar)".to_string(),
        })
    }
}

/// Extract `archive` into `dest` and return the source root
///
/// GitHub-style release tarballs wrap everything in one `name-version/`
/// directory; when the archive has exactly one top-level directory that
/// directory is the source root, otherwise `dest` itself is. Entries that
/// would land outside `dest` are rejected by the `tar` crate.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let format = ArchiveFormat::detect(archive)?;
    fs::create_dir_all(dest)?;

    let file = BufReader::new(File::open(archive)?);
    let wrap = |e: std::io::Error| Error::ArchiveError {
        path: archive.to_path_buf(),
        message: e.to_string(),
    };

    match format {
        ArchiveFormat::TarGz => unpack(tar::Archive::new(GzDecoder::new(file)), dest).map_err(wrap)?,
        ArchiveFormat::Tar => unpack(tar::Archive::new(file), dest).map_err(wrap)?,
    }

    source_root(dest)
}

fn unpack<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> std::io::Result<()> {
    archive.set_preserve_permissions(true);
    for entry in archive.entries()? {
        let mut entry = entry?;
        // unpack_in refuses paths that escape dest
        if !entry.unpack_in(dest)? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("entry escapes extraction directory: {}", entry.path()?.display()),
            ));
        }
    }
    Ok(())
}

fn source_root(dest: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(dest)?.filter_map(|e| e.ok()).collect();

    if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
        let root = entries[0].path();
        debug!("Source directory: {}", root.display());
        return Ok(root);
    }

    Ok(dest.to_path_buf())
}
