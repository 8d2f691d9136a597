//! Compile and link stage of the build pipeline.
//!
//! One compile-only pass over every top-level implementation file in the
//! submission directory, then one link pass over the produced objects. Both
//! run as child processes with their own timeout, clamped to the
//! submission's remaining deadline. Classification failures are values, not
//! errors: only spawn-level problems propagate as `Err`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{LimitsConfig, ToolchainConfig};
use crate::deadline::Deadline;
use crate::errors::{GraderError, GraderResult};
use crate::executor::truncate_capture;
use crate::source::is_implementation;
use crate::types::{BuildOutcome, Submission};

/// Outcome of the compile/link stage: either a runnable artifact or an
/// already-classified failure.
#[derive(Debug)]
pub enum LinkOutcome {
    Executable(PathBuf),
    Failed(BuildOutcome),
}

/// A resolved compiler command plus the flags it is invoked with.
pub struct Toolchain {
    command: PathBuf,
    config: ToolchainConfig,
}

impl Toolchain {
    /// Resolve the configured compiler on PATH before the batch starts.
    pub fn resolve(config: &ToolchainConfig) -> GraderResult<Self> {
        let command = which::which(&config.compiler)
            .map_err(|e| GraderError::Toolchain(format!("{}: {}", config.compiler, e)))?;
        Ok(Self {
            command,
            config: config.clone(),
        })
    }

    /// Compile every top-level `.cpp`-like file in the submission root, then
    /// link the objects into `<id><suffix>`.
    pub async fn compile_and_link(
        &self,
        submission: &Submission,
        limits: &LimitsConfig,
        deadline: Deadline,
    ) -> Result<LinkOutcome> {
        let sources = top_level_implementations(&submission.root);
        if sources.is_empty() {
            return Ok(LinkOutcome::Failed(BuildOutcome::CompileFailure {
                diagnostics: "no implementation files found at submission root".to_string(),
            }));
        }
        info!(submission = %submission.id, files = sources.len(), "compiling");

        let mut cmd = TokioCommand::new(&self.command);
        cmd.current_dir(&submission.root)
            .arg(&self.config.std_flag)
            .arg(&self.config.compile_flag)
            .args(&sources)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let budget = deadline.clamp(std::time::Duration::from_secs(limits.compile_timeout_secs));
        let output = match timeout(budget, cmd.output()).await {
            Ok(result) => result.context("failed to spawn compiler")?,
            Err(_) => {
                return Ok(LinkOutcome::Failed(BuildOutcome::CompileFailure {
                    diagnostics: format!("compilation timed out after {:.0?}", budget),
                }));
            }
        };

        let objects = object_files(&submission.root);
        if !output.status.success() || objects.is_empty() {
            let diagnostics = diagnostics_of(&output, limits);
            return Ok(LinkOutcome::Failed(BuildOutcome::CompileFailure { diagnostics }));
        }

        let executable = submission
            .root
            .join(format!("{}{}", submission.id, self.config.executable_suffix));
        debug!(submission = %submission.id, objects = objects.len(), "linking");

        let mut cmd = TokioCommand::new(&self.command);
        cmd.current_dir(&submission.root)
            .arg("-o")
            .arg(&executable)
            .args(&objects)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let budget = deadline.clamp(std::time::Duration::from_secs(limits.link_timeout_secs));
        let output = match timeout(budget, cmd.output()).await {
            Ok(result) => result.context("failed to spawn linker")?,
            Err(_) => {
                return Ok(LinkOutcome::Failed(BuildOutcome::LinkFailure {
                    diagnostics: format!("linking timed out after {:.0?}", budget),
                }));
            }
        };
        if !output.status.success() {
            let diagnostics = diagnostics_of(&output, limits);
            return Ok(LinkOutcome::Failed(BuildOutcome::LinkFailure { diagnostics }));
        }

        Ok(LinkOutcome::Executable(executable))
    }
}

fn diagnostics_of(output: &std::process::Output, limits: &LimitsConfig) -> String {
    let stderr = truncate_capture(&output.stderr, limits.stderr_capture_bytes);
    if stderr.is_empty() {
        truncate_capture(&output.stdout, limits.stdout_capture_bytes)
    } else {
        stderr
    }
}

/// Implementation files directly at the submission root, filename-relative
/// so toolchain diagnostics stay readable.
fn top_level_implementations(root: &Path) -> Vec<PathBuf> {
    list_by(root, is_implementation)
}

fn object_files(root: &Path) -> Vec<PathBuf> {
    list_by(root, |name| name.ends_with(".o"))
}

fn list_by(root: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter(|e| keep(&e.file_name().to_string_lossy()))
            .map(|e| PathBuf::from(e.file_name()))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}
