// src/install/config.rs

//! Configuration for the installer

use crate::db::paths;
use std::path::{Component, Path, PathBuf};

/// Where an installer puts things and how it behaves
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Installation prefix; executables land in `<prefix>/bin`
    pub prefix: PathBuf,
    /// Directory for verified source archives
    pub source_cache: PathBuf,
    /// Registry database
    pub db_path: PathBuf,
    /// Lock file serializing writers to this prefix
    pub lock_path: PathBuf,
    /// Parent for temporary build directories (system temp dir when `None`)
    pub build_root: Option<PathBuf>,
    /// Keep the build directory after the install finishes (for debugging)
    pub keep_builddir: bool,
    /// Reinstall even when the same release is already installed
    pub force: bool,
    /// Show download progress bars
    pub show_progress: bool,
}

/// `$HOME/.local/formulary`, or `/usr/local` without a home directory
pub fn default_prefix() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".local/formulary"))
        .unwrap_or_else(|| PathBuf::from("/usr/local"))
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self::for_prefix(&default_prefix())
    }
}

/// `prefix` as an absolute path with `.` and `..` folded away
///
/// Receipts record absolute file paths, so a relative prefix must resolve
/// to the same place whichever directory formulary runs from.
pub fn absolute_prefix(prefix: &Path) -> PathBuf {
    let absolute = std::path::absolute(prefix).unwrap_or_else(|_| prefix.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

impl InstallerConfig {
    /// Configuration with every path derived from `prefix`
    ///
    /// A relative `prefix` is resolved against the current directory.
    pub fn for_prefix(prefix: &Path) -> Self {
        let prefix = absolute_prefix(prefix);
        Self {
            source_cache: paths::source_cache_dir(&prefix),
            db_path: paths::db_path(&prefix),
            lock_path: paths::lock_path(&prefix),
            prefix,
            build_root: None,
            keep_builddir: false,
            force: false,
            show_progress: false,
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        paths::bin_dir(&self.prefix)
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_keep_builddir(mut self, keep: bool) -> Self {
        self.keep_builddir = keep;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_source_cache(mut self, dir: PathBuf) -> Self {
        self.source_cache = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_prefix_derives_paths() {
        let config = InstallerConfig::for_prefix(Path::new("/opt/fm"));
        assert_eq!(config.bin_dir(), PathBuf::from("/opt/fm/bin"));
        assert_eq!(
            config.db_path,
            PathBuf::from("/opt/fm/var/lib/formulary/formulary.db")
        );
        assert!(config.lock_path.starts_with("/opt/fm"));
        assert!(!config.force);
        assert!(!config.keep_builddir);
    }

    #[test]
    fn test_relative_prefix_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let config = InstallerConfig::for_prefix(Path::new("staging/../fm"));
        assert_eq!(config.prefix, cwd.join("fm"));
        assert_eq!(config.bin_dir(), cwd.join("fm/bin"));
        assert!(config.db_path.is_absolute());
        assert!(config.lock_path.is_absolute());
    }

    #[test]
    fn test_absolute_prefix_unchanged() {
        assert_eq!(absolute_prefix(Path::new("/opt/fm")), PathBuf::from("/opt/fm"));
        assert_eq!(absolute_prefix(Path::new("/opt/./fm/")), PathBuf::from("/opt/fm"));
    }

    #[test]
    fn test_builders() {
        let config = InstallerConfig::for_prefix(Path::new("/opt/fm"))
            .with_force(true)
            .with_keep_builddir(true)
            .with_source_cache(PathBuf::from("/tmp/cache"));
        assert!(config.force);
        assert!(config.keep_builddir);
        assert_eq!(config.source_cache, PathBuf::from("/tmp/cache"));
    }
}
