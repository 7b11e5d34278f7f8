// src/formula/repository.rs

//! The formula namespace: built-ins plus a directory of `*.toml` files

use crate::error::{Error, Result};
use crate::formula::builtin::builtin_formulas;
use crate::formula::format::PackageFormula;
use crate::formula::parser::{parse_formula_file, validate_formula};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a formula in the repository came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaOrigin {
    Builtin,
    File(PathBuf),
}

/// Name-indexed set of formulas
///
/// Names are unique: adding a second formula under an existing name is an
/// error rather than a silent override.
#[derive(Debug, Default)]
pub struct FormulaRepository {
    formulas: BTreeMap<String, (PackageFormula, FormulaOrigin)>,
}

impl FormulaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding only the built-in formulas
    pub fn with_builtins() -> Result<Self> {
        let mut repo = Self::new();
        for formula in builtin_formulas()? {
            repo.insert(formula, FormulaOrigin::Builtin)?;
        }
        Ok(repo)
    }

    /// Built-ins plus every formula in `dir` (if given)
    pub fn open(formula_dir: Option<&Path>) -> Result<Self> {
        let mut repo = Self::with_builtins()?;
        if let Some(dir) = formula_dir {
            repo.load_dir(dir)?;
        }
        Ok(repo)
    }

    /// Load all `*.toml` formulas from a directory
    ///
    /// Files are validated as they load; an invalid formula fails the whole
    /// load so a broken tap is noticed immediately.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            warn!("Formula directory {} does not exist", dir.display());
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in &paths {
            let formula = parse_formula_file(path)?;
            validate_formula(&formula).map_err(|e| {
                Error::ValidationError(format!("{}: {}", path.display(), e))
            })?;
            debug!("Loaded formula {} from {}", formula.id(), path.display());
            self.insert(formula, FormulaOrigin::File(path.clone()))?;
        }

        Ok(paths.len())
    }

    pub fn insert(&mut self, formula: PackageFormula, origin: FormulaOrigin) -> Result<()> {
        let name = formula.name().to_string();
        if let Some((_, existing)) = self.formulas.get(&name) {
            return Err(Error::ValidationError(format!(
                "Formula '{}' is already defined ({})",
                name,
                describe_origin(existing)
            )));
        }
        self.formulas.insert(name, (formula, origin));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&PackageFormula> {
        self.formulas
            .get(name)
            .map(|(formula, _)| formula)
            .ok_or_else(|| Error::NotFound(format!("No formula named '{}'", name)))
    }

    pub fn origin(&self, name: &str) -> Option<&FormulaOrigin> {
        self.formulas.get(name).map(|(_, origin)| origin)
    }

    /// Formulas whose name or description contains `query` (case-insensitive)
    pub fn search(&self, query: &str) -> Vec<&PackageFormula> {
        let needle = query.to_lowercase();
        self.formulas
            .values()
            .map(|(formula, _)| formula)
            .filter(|f| {
                needle.is_empty()
                    || f.package.name.to_lowercase().contains(&needle)
                    || f.package.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Resolve a command-line formula argument
    ///
    /// A path to an existing `.toml` file is parsed directly; anything else
    /// is looked up by name.
    pub fn load_formula(&self, reference: &str) -> Result<PackageFormula> {
        let path = Path::new(reference);
        let looks_like_path =
            reference.ends_with(".toml") || reference.contains(std::path::MAIN_SEPARATOR);
        if looks_like_path && path.is_file() {
            return parse_formula_file(path);
        }
        self.get(reference).cloned()
    }
}

fn describe_origin(origin: &FormulaOrigin) -> String {
    match origin {
        FormulaOrigin::Builtin => "built-in".to_string(),
        FormulaOrigin::File(path) => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTHER: &str = r#"
[package]
name = "hello"
description = "Prints a greeting"
version = "2.12"
license = "GPL-3.0-or-later"

[source]
url = "https://ftp.gnu.org/gnu/hello/hello-2.12.tar.gz"
sha256 = "cf04af86dc085268c5f4470fbae49b18afbc221b78096aab842d934a76bad0ab"

[[install]]
system = ["sh", "-c", "./configure && make"]

[[install]]
bin = "hello"
"#;

    #[test]
    fn test_builtins_present() {
        let repo = FormulaRepository::with_builtins().unwrap();
        assert!(repo.get("logformat").is_ok());
        assert_eq!(repo.origin("logformat"), Some(&FormulaOrigin::Builtin));
    }

    #[test]
    fn test_get_missing() {
        let repo = FormulaRepository::with_builtins().unwrap();
        assert!(matches!(repo.get("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.toml"), OTHER).unwrap();
        fs::write(dir.path().join("README.md"), "not a formula").unwrap();

        let repo = FormulaRepository::open(Some(dir.path())).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get("hello").unwrap().version(), "2.12");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dup = crate::formula::builtin::LOGFORMAT;
        fs::write(dir.path().join("logformat.toml"), dup).unwrap();

        let err = FormulaRepository::open(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let mut repo = FormulaRepository::new();
        assert_eq!(repo.load_dir(Path::new("/nonexistent/formulas")).unwrap(), 0);
        assert!(repo.is_empty());
    }

    #[test]
    fn test_search() {
        let repo = FormulaRepository::with_builtins().unwrap();
        assert_eq!(repo.search("log").len(), 1);
        assert_eq!(repo.search("FORMATTING").len(), 1);
        assert!(repo.search("kernel").is_empty());
        assert_eq!(repo.search("").len(), repo.len());
    }

    #[test]
    fn test_load_formula_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.toml");
        fs::write(&path, OTHER).unwrap();

        let repo = FormulaRepository::with_builtins().unwrap();
        let formula = repo.load_formula(path.to_str().unwrap()).unwrap();
        assert_eq!(formula.name(), "hello");

        let formula = repo.load_formula("logformat").unwrap();
        assert_eq!(formula.name(), "logformat");
    }
}
