//! Run stage: execute the linked artifact under a short wall-clock budget.
//!
//! The child gets a piped stdin that is held open and never written, so an
//! interactive program blocks waiting for input instead of reading EOF.
//! Blocking past the timeout is the expected shape of a working menu
//! program and classifies as `RunTimeout`, not as a failure.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::LimitsConfig;
use crate::deadline::Deadline;
use crate::types::BuildOutcome;

/// Spawn `executable` in `workdir` with no input and classify how it ends.
pub async fn run(
    executable: &Path,
    workdir: &Path,
    limits: &LimitsConfig,
    deadline: Deadline,
) -> Result<BuildOutcome> {
    let mut child = TokioCommand::new(executable)
        .current_dir(workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to start executable")?;

    // Keep the write end alive without writing: `wait` would otherwise drop
    // it and feed the program EOF.
    let _stdin = child.stdin.take();

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });

    let budget = deadline.clamp(Duration::from_secs(limits.run_timeout_secs));
    let waited = tokio::time::timeout(budget, child.wait()).await;

    match waited {
        Ok(status) => {
            let status = status.context("failed to wait for executable")?;
            let stdout = truncate_capture(
                &stdout_task.await.unwrap_or_default(),
                limits.stdout_capture_bytes,
            );
            let stderr = truncate_capture(
                &stderr_task.await.unwrap_or_default(),
                limits.stderr_capture_bytes,
            );
            match status.code() {
                Some(exit_code) => {
                    debug!(exit_code, "program exited");
                    Ok(BuildOutcome::RunCompleted {
                        exit_code,
                        stdout,
                        stderr,
                    })
                }
                None => Ok(BuildOutcome::RunCrashed {
                    signal: termination_signal(&status),
                    stdout,
                    stderr,
                }),
            }
        }
        Err(_) => {
            // Deadline elapsed with the program still running; kill it and
            // drain whatever it produced.
            let _ = child.kill().await;
            let _ = child.wait().await;
            let stdout = truncate_capture(
                &stdout_task.await.unwrap_or_default(),
                limits.stdout_capture_bytes,
            );
            let stderr = truncate_capture(
                &stderr_task.await.unwrap_or_default(),
                limits.stderr_capture_bytes,
            );
            debug!("program timed out waiting, killed");
            Ok(BuildOutcome::RunTimeout { stdout, stderr })
        }
    }
}

#[cfg(unix)]
fn termination_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Lossily decode captured output and cap it at `budget` bytes, cutting on a
/// UTF-8 character boundary.
pub fn truncate_capture(bytes: &[u8], budget: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= budget {
        return text.into_owned();
    }
    let mut end = budget;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_capture_passes_through() {
        assert_eq!(truncate_capture(b"hello", 1000), "hello");
    }

    #[test]
    fn capture_cut_at_byte_budget() {
        let out = truncate_capture(&[b'a'; 2000], 1000);
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        // Four-byte scorpion glyphs; a 6-byte budget lands mid-character.
        let text = "🦂🦂🦂".as_bytes();
        let out = truncate_capture(text, 6);
        assert_eq!(out, "🦂");
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let out = truncate_capture(&[0x66, 0xff, 0x6f], 100);
        assert_eq!(out, "f\u{fffd}o");
    }
}
