// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Fixtures are real `.tar.gz` source archives served through `file://`
//! URLs. Their "build" is a shell script, so no compiler is needed.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use formulary::fetch::FileFetcher;
use formulary::hash::{HashAlgorithm, hash_file};
use formulary::{DependencyResolver, Installer, InstallerConfig, NoopResolver, PackageFormula};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Build script shipped in every fixture: writes `out/<name>` and logs
/// each run to the marker file passed as `$1`
pub const BUILD_SCRIPT: &str = r#"#!/bin/sh
set -e
echo built >> "$1"
mkdir -p out
printf '#!/bin/sh\necho "%s %s"\n' "$2" "$3" > "out/$2"
"#;

/// A scratch area with a prefix, a source cache and a place for archives
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn prefix(&self) -> PathBuf {
        self.path().join("prefix")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.prefix().join("bin")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path().join("cache")
    }

    /// Marker file the fixture build appends to on every run
    pub fn marker(&self) -> PathBuf {
        self.path().join("build-runs.log")
    }

    /// How many times a fixture build step has run
    pub fn build_runs(&self) -> usize {
        fs::read_to_string(self.marker())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Files in the bin directory, hidden staging files included
    pub fn bin_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.bin_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn config(&self) -> InstallerConfig {
        let mut config =
            InstallerConfig::for_prefix(&self.prefix()).with_source_cache(self.cache_dir());
        config.build_root = Some(self.path().join("build"));
        config
    }

    pub fn installer(&self) -> Installer {
        self.installer_with(self.config(), Arc::new(NoopResolver))
    }

    pub fn installer_with(
        &self,
        config: InstallerConfig,
        resolver: Arc<dyn DependencyResolver>,
    ) -> Installer {
        Installer::with_parts(config, resolver, Arc::new(FileFetcher))
    }

    /// Write `<name>-<version>.tar.gz` holding the build script
    pub fn source_archive(&self, name: &str, version: &str) -> PathBuf {
        let top = format!("{name}-{version}");
        self.archive_with(
            &format!("{top}.tar.gz"),
            &[
                (format!("{top}/build.sh"), BUILD_SCRIPT.as_bytes().to_vec()),
                (format!("{top}/README"), format!("{name} {version}\n").into_bytes()),
            ],
        )
    }

    pub fn archive_with(&self, filename: &str, files: &[(String, Vec<u8>)]) -> PathBuf {
        let dir = self.path().join("archives");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);

        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_slice()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    /// Formula whose build runs the fixture script and installs `out/<name>`
    pub fn formula(&self, name: &str, version: &str, archive: &Path) -> FormulaBuilder {
        FormulaBuilder {
            name: name.to_string(),
            version: version.to_string(),
            url: file_url(archive),
            sha256: sha256_of(archive),
            depends_on: Vec::new(),
            system: vec![
                "sh".to_string(),
                "build.sh".to_string(),
                self.marker().to_string_lossy().to_string(),
                name.to_string(),
                version.to_string(),
            ],
            bin: format!("out/{name}"),
        }
    }
}

pub struct FormulaBuilder {
    pub name: String,
    pub version: String,
    pub url: String,
    pub sha256: String,
    pub depends_on: Vec<String>,
    pub system: Vec<String>,
    pub bin: String,
}

impl FormulaBuilder {
    pub fn sha256(mut self, sha256: &str) -> Self {
        self.sha256 = sha256.to_string();
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.depends_on.push(dep.to_string());
        self
    }

    pub fn system(mut self, argv: &[&str]) -> Self {
        self.system = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn bin(mut self, path: &str) -> Self {
        self.bin = path.to_string();
        self
    }

    pub fn to_toml(&self) -> String {
        let mut toml = format!(
            r#"[package]
name = "{}"
description = "Test fixture tool"
homepage = "https://example.com/{}"
version = "{}"
license = "MIT"

[source]
url = "{}"
sha256 = "{}"
"#,
            self.name, self.name, self.version, self.url, self.sha256
        );

        for dep in &self.depends_on {
            toml.push_str(&format!("\n[[depends_on]]\nname = \"{dep}\"\nphase = \"build\"\n"));
        }

        let argv: Vec<String> = self.system.iter().map(|a| format!("{a:?}")).collect();
        toml.push_str(&format!("\n[[install]]\nsystem = [{}]\n", argv.join(", ")));
        toml.push_str(&format!("\n[[install]]\nbin = \"{}\"\n", self.bin));
        toml
    }

    pub fn build(&self) -> PackageFormula {
        formulary::formula::parse_formula(&self.to_toml()).unwrap()
    }
}

pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).unwrap().to_string()
}

pub fn sha256_of(path: &Path) -> String {
    hash_file(HashAlgorithm::Sha256, path).unwrap().value
}
