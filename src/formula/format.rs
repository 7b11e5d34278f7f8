// src/formula/format.rs

//! Formula file format definitions
//!
//! Formulas are TOML files pinning one release of a tool: where its source
//! archive lives, the digest that archive must have, what has to be on the
//! machine to build it, and the ordered steps that turn the unpacked source
//! into files under the prefix's `bin` directory.

use crate::error::Result;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A complete formula for one released version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFormula {
    /// Identity metadata
    pub package: PackageSection,

    /// Source archive and its integrity digest
    pub source: SourceSection,

    /// Tools that must be present before the install procedure runs
    #[serde(default)]
    pub depends_on: Vec<BuildDependency>,

    /// Ordered install procedure
    pub install: Vec<InstallStep>,
}

/// Package metadata section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,

    /// Short human-readable description
    pub description: String,

    #[serde(default)]
    pub homepage: Option<String>,

    pub version: String,

    /// SPDX license identifier or expression
    pub license: String,
}

/// Source archive section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSection {
    /// Archive URL (`https://`, `http://` or `file://`)
    pub url: String,

    /// Bare SHA-256 hex digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Prefixed digest (`sha256:...` or `sha512:...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl SourceSection {
    /// The digest text exactly as written in the formula
    pub fn integrity_digest(&self) -> &str {
        self.sha256
            .as_deref()
            .or(self.checksum.as_deref())
            .unwrap_or("")
    }

    /// Parse the digest, validating its length against the algorithm
    pub fn digest(&self) -> Result<Hash> {
        match (&self.sha256, &self.checksum) {
            (Some(_), Some(_)) => Err(crate::Error::ValidationError(
                "source declares both `sha256` and `checksum`".to_string(),
            )),
            (None, None) => Err(crate::Error::ValidationError(
                "source has no `sha256` or `checksum` digest".to_string(),
            )),
            (Some(hex), None) => Ok(Hash::new(crate::hash::HashAlgorithm::Sha256, hex.trim())?),
            (None, Some(prefixed)) => Ok(Hash::parse_prefixed(prefixed)?),
        }
    }
}

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyPhase {
    /// Only needed while building
    Build,
    /// Needed by the installed tool as well
    #[default]
    Runtime,
}

impl DependencyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyPhase::Build => "build",
            DependencyPhase::Runtime => "runtime",
        }
    }
}

/// A (tool, phase) dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildDependency {
    pub name: String,
    #[serde(default)]
    pub phase: DependencyPhase,
}

impl BuildDependency {
    pub fn build(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: DependencyPhase::Build,
        }
    }

    pub fn is_build_only(&self) -> bool {
        self.phase == DependencyPhase::Build
    }
}

impl fmt::Display for BuildDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.phase.as_str())
    }
}

/// One step of the install procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStep {
    /// Run a program with arguments inside the unpacked source tree
    System(Vec<String>),

    /// Copy a built file (relative to the source tree) into `bin`
    Bin(String),
}

impl InstallStep {
    /// Name of the file this step places into `bin`, if any
    pub fn installed_name(&self) -> Option<&str> {
        match self {
            InstallStep::Bin(path) => Path::new(path).file_name().and_then(|n| n.to_str()),
            InstallStep::System(_) => None,
        }
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStep::System(argv) => write!(f, "system {}", argv.join(" ")),
            InstallStep::Bin(path) => write!(f, "bin.install {}", path),
        }
    }
}

/// The fields a runtime needs to fetch the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub source_url: String,
    pub integrity_digest: String,
    pub version: String,
}

impl PackageFormula {
    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> &str {
        &self.package.version
    }

    /// `name-version`, the identity a receipt is tagged with
    pub fn id(&self) -> String {
        format!("{}-{}", self.package.name, self.package.version)
    }

    /// Read the fetch triple; pure, always succeeds
    pub fn resolve(&self) -> ResolvedSource {
        ResolvedSource {
            source_url: self.source.url.clone(),
            integrity_digest: self.source.integrity_digest().to_string(),
            version: self.package.version.clone(),
        }
    }

    pub fn build_dependencies(&self) -> &[BuildDependency] {
        &self.depends_on
    }

    /// Dependencies needed only while building
    pub fn build_time_dependencies(&self) -> Vec<&BuildDependency> {
        self.depends_on.iter().filter(|d| d.is_build_only()).collect()
    }

    /// File names the install procedure places into `bin`
    pub fn installed_binaries(&self) -> Vec<&str> {
        self.install
            .iter()
            .filter_map(InstallStep::installed_name)
            .collect()
    }

    /// File name of the source archive, taken from the URL
    pub fn archive_filename(&self) -> String {
        let trimmed = self.source.url.split(['?', '#']).next().unwrap_or("");
        match trimmed.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}.tar.gz", self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FORMULA: &str = r#"
[package]
name = "ripgrep"
description = "Recursively search directories for a regex pattern"
homepage = "https://github.com/BurntSushi/ripgrep"
version = "14.1.0"
license = "MIT OR Unlicense"

[source]
url = "https://github.com/BurntSushi/ripgrep/archive/refs/tags/14.1.0.tar.gz"
checksum = "sha256:33c6169596a6bbfdc81415910008f26e0809422fda2d849562637996553b2ab6"

[[depends_on]]
name = "rust"
phase = "build"

[[depends_on]]
name = "pcre2"

[[install]]
system = ["cargo", "build", "--release", "--bin", "rg"]

[[install]]
bin = "target/release/rg"
"#;

    #[test]
    fn test_parse_formula() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();

        assert_eq!(formula.name(), "ripgrep");
        assert_eq!(formula.version(), "14.1.0");
        assert_eq!(formula.id(), "ripgrep-14.1.0");
        assert_eq!(formula.depends_on.len(), 2);
        assert_eq!(formula.install.len(), 2);
        assert_eq!(
            formula.install[0],
            InstallStep::System(vec![
                "cargo".into(),
                "build".into(),
                "--release".into(),
                "--bin".into(),
                "rg".into()
            ])
        );
        assert_eq!(formula.install[1], InstallStep::Bin("target/release/rg".into()));
    }

    #[test]
    fn test_dependency_phase_defaults_to_runtime() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();
        assert_eq!(formula.depends_on[0].phase, DependencyPhase::Build);
        assert_eq!(formula.depends_on[1].phase, DependencyPhase::Runtime);

        let build_only = formula.build_time_dependencies();
        assert_eq!(build_only.len(), 1);
        assert_eq!(build_only[0].name, "rust");
    }

    #[test]
    fn test_resolve() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();
        let resolved = formula.resolve();
        assert_eq!(
            resolved.source_url,
            "https://github.com/BurntSushi/ripgrep/archive/refs/tags/14.1.0.tar.gz"
        );
        assert!(resolved.integrity_digest.starts_with("sha256:"));
        assert_eq!(resolved.version, "14.1.0");
    }

    #[test]
    fn test_installed_binaries() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();
        assert_eq!(formula.installed_binaries(), vec!["rg"]);
    }

    #[test]
    fn test_archive_filename() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();
        assert_eq!(formula.archive_filename(), "14.1.0.tar.gz");
    }

    #[test]
    fn test_digest_from_bare_sha256() {
        let source = SourceSection {
            url: "https://example.com/a-1.0.tar.gz".into(),
            sha256: Some("a".repeat(64)),
            checksum: None,
        };
        assert_eq!(source.integrity_digest(), "a".repeat(64));
        assert_eq!(source.digest().unwrap().value, "a".repeat(64));
    }

    #[test]
    fn test_digest_both_fields_rejected() {
        let source = SourceSection {
            url: "https://example.com/a-1.0.tar.gz".into(),
            sha256: Some("a".repeat(64)),
            checksum: Some(format!("sha256:{}", "a".repeat(64))),
        };
        assert!(source.digest().is_err());
    }

    #[test]
    fn test_digest_missing_rejected() {
        let source = SourceSection {
            url: "https://example.com/a-1.0.tar.gz".into(),
            sha256: None,
            checksum: None,
        };
        assert!(source.digest().is_err());
    }

    #[test]
    fn test_install_step_display() {
        let step = InstallStep::System(vec!["make".into(), "install".into()]);
        assert_eq!(step.to_string(), "system make install");
        assert_eq!(
            InstallStep::Bin("out/tool".into()).to_string(),
            "bin.install out/tool"
        );
    }

    #[test]
    fn test_serialize_round_trip_keeps_step_shape() {
        let formula: PackageFormula = toml::from_str(SAMPLE_FORMULA).unwrap();
        let text = toml::to_string(&formula).unwrap();
        assert!(text.contains("[[install]]"));
        let reparsed: PackageFormula = toml::from_str(&text).unwrap();
        assert_eq!(reparsed, formula);
    }
}
