//! Subprocess execution.
//!
//! Launches external programs (adb, the Gradle wrapper) with an argument
//! vector, drains both output pipes concurrently while the child runs, and
//! enforces a hard deadline with forced termination. The result is always a
//! single `ProcessOutcome`; the executor never interprets exit codes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

/// System executor built on `tokio::process`.
pub mod executor;

/// Executable resolution and permission checks.
pub mod locator;

pub use executor::SystemExecutor;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Description of a single process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Program to launch: a bare name searched on `PATH`, or a path.
    pub program: PathBuf,
    /// Arguments passed to the program, in order.
    pub args: Vec<String>,
    /// Working directory for the child; inherits ours when `None`.
    pub working_dir: Option<PathBuf>,
    /// Hard deadline for the whole run, including output capture.
    pub timeout: Duration,
}

impl ProcessSpec {
    /// Creates a spec that runs in the current working directory.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout,
        }
    }

    /// Sets the working directory of the child.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Short program name used in logs and error messages.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

/// Terminal classification of one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited before the deadline and both pipes were drained
    /// to completion.
    Completed {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        /// OS exit code, or -1 when the process was killed by a signal.
        exit_code: i32,
    },
    /// The deadline elapsed; the process was killed and its output discarded.
    TimedOut,
    /// The process could not be started, or its output could not be captured.
    LaunchFailed { reason: String },
}

/// Runs processes described by a `ProcessSpec`.
///
/// Implementations must never panic or return early with partial output:
/// every failure is folded into `ProcessOutcome`.
pub trait Executor: Send + Sync {
    fn execute(&self, spec: ProcessSpec) -> BoxFuture<'_, ProcessOutcome>;
}
