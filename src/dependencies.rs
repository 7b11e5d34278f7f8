// src/dependencies.rs

//! Build dependency resolution
//!
//! Formulas declare dependencies by name (`rust`, `cmake`, ...). Before any
//! source is fetched the installer asks a resolver which of them are
//! missing and whether it can provide them; anything still missing aborts
//! the install before a build step can run.

use crate::error::{Error, Result};
use crate::formula::{BuildDependency, PackageFormula};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Decides whether dependencies are present and, optionally, installs them
pub trait DependencyResolver: Send + Sync {
    /// Names of the dependencies that are not currently available
    fn check_missing(&self, deps: &[&BuildDependency]) -> Result<Vec<String>>;

    /// Try to install the named dependencies
    ///
    /// Returns the names that were actually installed.
    fn install(&self, deps: &[String]) -> Result<Vec<String>>;
}

/// Executable a dependency name provides
pub fn provided_tool(dependency: &str) -> &str {
    match dependency {
        "rust" => "cargo",
        "go" => "go",
        "node" => "node",
        "python" | "python3" => "python3",
        "pkgconf" | "pkg-config" => "pkg-config",
        other => other,
    }
}

/// Treats a dependency as present when its tool is on `PATH`
///
/// It cannot install anything: whatever is missing stays missing.
#[derive(Debug, Default, Clone)]
pub struct PathResolver {
    /// Search these directories instead of `PATH` when set
    search_path: Option<Vec<PathBuf>>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict lookups to the given directories
    pub fn with_search_path(dirs: Vec<PathBuf>) -> Self {
        Self {
            search_path: Some(dirs),
        }
    }

    /// Full path of the tool a dependency provides, if found
    pub fn locate(&self, dependency: &str) -> Option<PathBuf> {
        let tool = provided_tool(dependency);
        match &self.search_path {
            Some(dirs) => {
                let joined = std::env::join_paths(dirs).ok()?;
                let cwd = std::env::current_dir().ok()?;
                which::which_in(tool, Some(joined), cwd).ok()
            }
            None => which::which(tool).ok(),
        }
    }
}

impl DependencyResolver for PathResolver {
    fn check_missing(&self, deps: &[&BuildDependency]) -> Result<Vec<String>> {
        Ok(deps
            .iter()
            .filter(|dep| match self.locate(&dep.name) {
                Some(path) => {
                    debug!("{} provided by {}", dep.name, path.display());
                    false
                }
                None => true,
            })
            .map(|dep| dep.name.clone())
            .collect())
    }

    fn install(&self, _deps: &[String]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Assumes every dependency is satisfied
///
/// For pre-provisioned build machines where the check is pointless.
pub struct NoopResolver;

impl DependencyResolver for NoopResolver {
    fn check_missing(&self, _deps: &[&BuildDependency]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn install(&self, _deps: &[String]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Outcome of resolving a formula's dependencies
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub already_installed: Vec<String>,
    pub newly_installed: Vec<String>,
}

/// Make sure every declared dependency is available
///
/// Fails with `DependencyError` naming whatever could not be provided.
pub fn resolve_build_dependencies(
    formula: &PackageFormula,
    resolver: &dyn DependencyResolver,
) -> Result<DependencyReport> {
    let deps: Vec<&BuildDependency> = formula.build_dependencies().iter().collect();

    if deps.is_empty() {
        debug!("{} declares no dependencies", formula.name());
        return Ok(DependencyReport::default());
    }

    info!(
        "Checking dependencies: {}",
        deps.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
    );

    let missing = resolver.check_missing(&deps)?;
    let missing_set: HashSet<&str> = missing.iter().map(String::as_str).collect();
    let already_installed: Vec<String> = deps
        .iter()
        .filter(|d| !missing_set.contains(d.name.as_str()))
        .map(|d| d.name.clone())
        .collect();

    if missing.is_empty() {
        return Ok(DependencyReport {
            already_installed,
            newly_installed: Vec::new(),
        });
    }

    info!("Installing missing dependencies: {}", missing.join(", "));
    let installed = resolver.install(&missing)?;

    let installed_set: HashSet<&str> = installed.iter().map(String::as_str).collect();
    let unresolved: Vec<String> = missing
        .iter()
        .filter(|d| !installed_set.contains(d.as_str()))
        .map(|d| format!("{} (needs `{}`)", d, provided_tool(d)))
        .collect();

    if !unresolved.is_empty() {
        warn!("Could not resolve dependencies: {}", unresolved.join(", "));
        return Err(Error::DependencyError(format!(
            "{} requires {} which could not be found or installed",
            formula.id(),
            unresolved.join(", ")
        )));
    }

    Ok(DependencyReport {
        already_installed,
        newly_installed: installed,
    })
}
