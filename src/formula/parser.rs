// src/formula/parser.rs

//! Formula file parsing and validation

use crate::error::{Error, Result};
use crate::formula::format::{InstallStep, PackageFormula};
use crate::formula::license;
use std::collections::HashSet;
use std::path::{Component, Path};
use url::Url;

/// Parse a formula from a TOML string
pub fn parse_formula(content: &str) -> Result<PackageFormula> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid formula: {}", e)))
}

/// Parse a formula from a file
pub fn parse_formula_file(path: &Path) -> Result<PackageFormula> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::IoError(format!(
            "Failed to read formula file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_formula(&content)
}

/// Check that a name is usable as a formula identifier and a file name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '+' | '-'))
}

/// Validate a formula against its invariants
///
/// Hard violations are returned as `Error::ValidationError`; soft issues
/// come back as a list of warnings.
pub fn validate_formula(formula: &PackageFormula) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let package = &formula.package;

    if !is_valid_name(&package.name) {
        return Err(Error::ValidationError(format!(
            "Invalid package name '{}': must match [a-z0-9][a-z0-9._+-]*",
            package.name
        )));
    }
    if package.description.trim().is_empty() {
        return Err(Error::ValidationError(
            "Package description cannot be empty".to_string(),
        ));
    }
    if package.version.trim().is_empty() {
        return Err(Error::ValidationError(
            "Package version cannot be empty".to_string(),
        ));
    }

    match &package.homepage {
        Some(homepage) => {
            Url::parse(homepage).map_err(|e| {
                Error::ValidationError(format!("Invalid homepage URL '{}': {}", homepage, e))
            })?;
        }
        None => warnings.push("Missing package homepage".to_string()),
    }

    if !license::is_recognized(&package.license) {
        return Err(Error::ValidationError(format!(
            "Unrecognized license '{}'",
            package.license
        )));
    }

    // Source URL must be fetchable and pin the version it claims
    let source_url = Url::parse(&formula.source.url).map_err(|e| {
        Error::ValidationError(format!("Invalid source URL '{}': {}", formula.source.url, e))
    })?;
    match source_url.scheme() {
        "https" | "file" => {}
        "http" => warnings.push(format!(
            "Source URL uses plain http: {}",
            formula.source.url
        )),
        other => {
            return Err(Error::ValidationError(format!(
                "Unsupported source URL scheme '{}'",
                other
            )));
        }
    }
    if !url_pins_version(&source_url, &package.version) {
        return Err(Error::ValidationError(format!(
            "Version '{}' does not appear in source URL '{}'",
            package.version, formula.source.url
        )));
    }

    formula.source.digest()?;

    let mut seen = HashSet::new();
    for dep in &formula.depends_on {
        if dep.name.trim().is_empty() {
            return Err(Error::ValidationError(
                "Dependency name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(dep.name.as_str()) {
            return Err(Error::ValidationError(format!(
                "Dependency '{}' declared more than once",
                dep.name
            )));
        }
    }

    validate_install_procedure(&formula.install)?;

    Ok(warnings)
}

fn validate_install_procedure(steps: &[InstallStep]) -> Result<()> {
    if steps.is_empty() {
        return Err(Error::ValidationError(
            "Install procedure is empty".to_string(),
        ));
    }

    let mut installed = HashSet::new();
    for step in steps {
        match step {
            InstallStep::System(argv) => {
                if argv.first().is_none_or(|program| program.trim().is_empty()) {
                    return Err(Error::ValidationError(
                        "`system` step needs a program to run".to_string(),
                    ));
                }
            }
            InstallStep::Bin(path) => {
                let rel = Path::new(path);
                let escapes = rel.components().any(|c| {
                    matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
                });
                if path.is_empty() || escapes {
                    return Err(Error::ValidationError(format!(
                        "`bin` path '{}' must be relative to the source tree",
                        path
                    )));
                }
                let Some(name) = step.installed_name() else {
                    return Err(Error::ValidationError(format!(
                        "`bin` path '{}' has no file name",
                        path
                    )));
                };
                if !installed.insert(name) {
                    return Err(Error::ValidationError(format!(
                        "Two `bin` steps install the same file '{}'",
                        name
                    )));
                }
            }
        }
    }

    if installed.is_empty() {
        return Err(Error::ValidationError(
            "Install procedure never copies anything into bin".to_string(),
        ));
    }

    Ok(())
}

/// Suffixes a version may be followed by at the end of a file name
const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar", ".tar.xz", ".tar.bz2", ".zip"];

/// Whether some path segment of `url` names exactly `version`
///
/// The version must stand alone in the segment (`1.2.3`, `v1.2.3`) or be
/// delimited by `-`/`_` or a trailing archive extension (`tool-1.2.3.tar.gz`).
fn url_pins_version(url: &Url, version: &str) -> bool {
    url.path_segments()
        .into_iter()
        .flatten()
        .any(|segment| segment_pins_version(segment, version))
}

fn segment_pins_version(segment: &str, version: &str) -> bool {
    segment.match_indices(version).any(|(start, _)| {
        let before = &segment[..start];
        let after = &segment[start + version.len()..];
        let before_ok = before.is_empty()
            || before.ends_with(['-', '_'])
            || before == "v"
            || before.ends_with("-v")
            || before.ends_with("_v");
        let after_ok = after.is_empty()
            || after.starts_with(['-', '_'])
            || ARCHIVE_EXTENSIONS.contains(&after);
        before_ok && after_ok
    })
}
