//! Command translators.
//!
//! Pure functions that turn typed tool parameters into argument vectors for
//! the executor, and that classify a `ProcessOutcome` into either captured
//! output or a domain error.

use std::time::Duration;

use crate::errors::{AdbMcpError, Result};
use crate::process::ProcessOutcome;

/// Argument vectors and output parsing for adb.
pub mod adb;

/// Gradle wrapper invocation.
pub mod gradle;

/// Output of a process that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    /// Stdout decoded as UTF-8, invalid sequences replaced.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr decoded as UTF-8, invalid sequences replaced.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Maps an outcome to captured output, or to the error describing why the
/// run failed. `failure_detail` renders the diagnostic text embedded in the
/// error for a non-zero exit.
pub fn classify(
    program: &str,
    timeout: Duration,
    outcome: ProcessOutcome,
    failure_detail: fn(&Captured) -> String,
) -> Result<Captured> {
    match outcome {
        ProcessOutcome::Completed {
            stdout,
            stderr,
            exit_code,
        } => {
            let captured = Captured { stdout, stderr };
            if exit_code == 0 {
                Ok(captured)
            } else {
                Err(AdbMcpError::CommandFailed {
                    program: program.to_string(),
                    exit_code,
                    detail: failure_detail(&captured),
                })
            }
        }
        ProcessOutcome::TimedOut => Err(AdbMcpError::Timeout {
            program: program.to_string(),
            timeout,
        }),
        ProcessOutcome::LaunchFailed { reason } => Err(AdbMcpError::Launch {
            program: program.to_string(),
            reason,
        }),
    }
}

/// Trimmed stderr, or trimmed stdout when stderr is blank.
pub fn stderr_or_stdout(captured: &Captured) -> String {
    let stderr = captured.stderr_text();
    if stderr.trim().is_empty() {
        captured.stdout_text().trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}
