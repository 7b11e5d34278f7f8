// src/install/plan.rs

//! Turning a formula's install procedure into concrete steps

use crate::error::{Error, Result};
use crate::formula::{InstallStep, PackageFormula};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A step with every path resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    /// Run `program args...` with `workdir` as the working directory
    Run {
        program: String,
        args: Vec<String>,
        workdir: PathBuf,
    },
    /// Copy the built file `source` to `dest` in the bin directory
    Copy { source: PathBuf, dest: PathBuf },
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedStep::Run { program, args, .. } if args.is_empty() => write!(f, "{program}"),
            PlannedStep::Run { program, args, .. } => write!(f, "{} {}", program, args.join(" ")),
            PlannedStep::Copy { source, dest } => {
                write!(f, "install {} -> {}", source.display(), dest.display())
            }
        }
    }
}

/// Ordered steps for one install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub steps: Vec<PlannedStep>,
}

impl InstallPlan {
    pub fn runs(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s, PlannedStep::Run { .. }))
    }

    /// `(source, dest)` for every artifact the plan installs
    pub fn copies(&self) -> Vec<(&Path, &Path)> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                PlannedStep::Copy { source, dest } => Some((source.as_path(), dest.as_path())),
                PlannedStep::Run { .. } => None,
            })
            .collect()
    }

    /// Every path the plan writes in the bin directory
    pub fn destinations(&self) -> Vec<&Path> {
        self.copies().into_iter().map(|(_, dest)| dest).collect()
    }
}

/// Plan the install of `formula` from an unpacked `source_root` into `bin_dir`
///
/// Pure path computation; nothing is read or written.
pub fn plan(formula: &PackageFormula, source_root: &Path, bin_dir: &Path) -> Result<InstallPlan> {
    let mut steps = Vec::with_capacity(formula.install.len());

    for step in &formula.install {
        match step {
            InstallStep::System(argv) => {
                let (program, args) = argv.split_first().ok_or_else(|| {
                    Error::InstallError(format!("{}: empty system step", formula.id()))
                })?;
                steps.push(PlannedStep::Run {
                    program: program.clone(),
                    args: args.to_vec(),
                    workdir: source_root.to_path_buf(),
                });
            }
            InstallStep::Bin(relative) => {
                let relative_path = Path::new(relative);
                if !is_contained(relative_path) {
                    return Err(Error::InstallError(format!(
                        "{}: artifact path escapes the source tree: {}",
                        formula.id(),
                        relative
                    )));
                }
                let name = step.installed_name().ok_or_else(|| {
                    Error::InstallError(format!(
                        "{}: artifact path has no file name: {}",
                        formula.id(),
                        relative
                    ))
                })?;
                steps.push(PlannedStep::Copy {
                    source: source_root.join(relative_path),
                    dest: bin_dir.join(name),
                });
            }
        }
    }

    Ok(InstallPlan { steps })
}

/// Relative with no `..`, so joining it to a root stays under that root
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::builtin::LOGFORMAT;
    use crate::formula::parse_formula;

    #[test]
    fn test_plan_logformat() {
        let formula = parse_formula(LOGFORMAT).unwrap();
        let plan = plan(&formula, Path::new("/build/src"), Path::new("/prefix/bin")).unwrap();

        assert_eq!(
            plan.steps,
            vec![
                PlannedStep::Run {
                    program: "cargo".to_string(),
                    args: vec![
                        "build".to_string(),
                        "--release".to_string(),
                        "--bin".to_string(),
                        "logformat".to_string(),
                    ],
                    workdir: PathBuf::from("/build/src"),
                },
                PlannedStep::Copy {
                    source: PathBuf::from("/build/src/target/release/logformat"),
                    dest: PathBuf::from("/prefix/bin/logformat"),
                },
            ]
        );
        assert_eq!(plan.runs().count(), 1);
        assert_eq!(plan.destinations(), vec![Path::new("/prefix/bin/logformat")]);
    }

    #[test]
    fn test_plan_rejects_escaping_artifact() {
        let mut formula = parse_formula(LOGFORMAT).unwrap();
        formula.install = vec![InstallStep::Bin("../../etc/passwd".to_string())];
        assert!(matches!(
            plan(&formula, Path::new("/src"), Path::new("/bin")),
            Err(Error::InstallError(_))
        ));

        formula.install = vec![InstallStep::Bin("/usr/bin/sh".to_string())];
        assert!(plan(&formula, Path::new("/src"), Path::new("/bin")).is_err());
    }

    #[test]
    fn test_plan_rejects_empty_system_step() {
        let mut formula = parse_formula(LOGFORMAT).unwrap();
        formula.install.insert(0, InstallStep::System(Vec::new()));
        assert!(matches!(
            plan(&formula, Path::new("/src"), Path::new("/bin")),
            Err(Error::InstallError(_))
        ));
    }

    #[test]
    fn test_display() {
        let step = PlannedStep::Run {
            program: "make".to_string(),
            args: vec!["-j4".to_string()],
            workdir: PathBuf::from("/src"),
        };
        assert_eq!(step.to_string(), "make -j4");
    }
}
