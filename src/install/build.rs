// src/install/build.rs

//! Running the build steps of a plan

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::plan::{InstallPlan, PlannedStep};

/// Lines of stderr kept in a `BuildError`
const STDERR_TAIL_LINES: usize = 40;

/// Runs the `Run` steps of a plan in order and keeps their output
#[derive(Debug, Default)]
pub struct BuildLog {
    log: String,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every build step, stopping at the first failure
    pub fn run_all(&mut self, plan: &InstallPlan) -> Result<()> {
        for step in plan.runs() {
            if let PlannedStep::Run {
                program,
                args,
                workdir,
            } = step
            {
                self.run_step(program, args, workdir)?;
            }
        }
        Ok(())
    }

    /// Run one program to completion
    ///
    /// Blocks without a timeout. A spawn failure or non-zero exit is a
    /// `BuildError` carrying the tail of stderr.
    pub fn run_step(&mut self, program: &str, args: &[String], workdir: &Path) -> Result<()> {
        let command_line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        info!("Running {}", command_line);
        debug!("Working directory: {}", workdir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .output()
            .map_err(|e| Error::BuildError {
                step: command_line.clone(),
                status: format!("failed to start: {e}"),
                stderr: String::new(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        self.log_output(&command_line, &stdout, &stderr);

        if !output.status.success() {
            return Err(Error::BuildError {
                step: command_line,
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.log
    }

    /// Write everything captured so far to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.log).map_err(|e| {
            Error::IoError(format!("Failed to write build log {}: {}", path.display(), e))
        })?;
        debug!("Build log written to {}", path.display());
        Ok(())
    }

    fn log_output(&mut self, step: &str, stdout: &str, stderr: &str) {
        self.log.push_str(&format!("=== {} ===\n", step));
        for chunk in [stdout, stderr] {
            if !chunk.is_empty() {
                debug!("{}", chunk.trim_end());
                self.log.push_str(chunk);
                if !chunk.ends_with('\n') {
                    self.log.push('\n');
                }
            }
        }
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_successful_step_runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut build = BuildLog::new();
        build
            .run_step("sh", &args(&["-c", "echo built > out.txt"]), dir.path())
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "built\n"
        );
    }

    #[test]
    fn test_nonzero_exit_is_build_error_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut build = BuildLog::new();
        let err = build
            .run_step("sh", &args(&["-c", "echo broken >&2; exit 3"]), dir.path())
            .unwrap_err();
        match err {
            Error::BuildError { step, status, stderr } => {
                assert!(step.starts_with("sh -c"));
                assert!(status.contains('3'));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected BuildError, got {other:?}"),
        }
        assert!(build.as_str().contains("broken"));

        let log_path = dir.path().join("build.log");
        build.save(&log_path).unwrap();
        let saved = std::fs::read_to_string(&log_path).unwrap();
        assert!(saved.starts_with("=== sh -c"));
        assert!(saved.contains("broken"));
    }

    #[test]
    fn test_missing_program_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildLog::new()
            .run_step("formulary-no-such-program", &[], dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::BuildError { .. }));
    }

    #[test]
    fn test_tail() {
        let text = (1..=5).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(tail(&text, 2), "4\n5");
        assert_eq!(tail("one", 10), "one");
    }
}
