use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use super::locator;
use super::{BoxFuture, Executor, ProcessOutcome, ProcessSpec};

/// How long drains may keep flushing after a forced kill before they are abandoned.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(500);

type Drain = JoinHandle<io::Result<Vec<u8>>>;

/// Executor that runs real child processes.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    drain_grace: Duration,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_DRAIN_GRACE)
    }
}

impl SystemExecutor {
    /// Creates an executor with the given post-kill drain grace period.
    pub fn new(drain_grace: Duration) -> Self {
        Self { drain_grace }
    }

    /// Runs `spec` to a terminal outcome.
    ///
    /// Both pipes are drained by their own task from the moment the child is
    /// spawned, so a child that fills one pipe while we wait on the other can
    /// never stall. The deadline covers the exit-wait and the final drain join.
    pub async fn run(&self, spec: ProcessSpec) -> ProcessOutcome {
        let name = spec.display_name();

        let program = match locator::locate(&spec.program) {
            Ok(path) => path,
            Err(reason) => {
                warn!(program = %name, %reason, "executable lookup failed");
                return ProcessOutcome::LaunchFailed { reason };
            }
        };

        let mut cmd = Command::new(&program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        let Some(deadline) = Instant::now().checked_add(spec.timeout) else {
            warn!(program = %name, timeout = ?spec.timeout, "timeout out of range");
            return ProcessOutcome::LaunchFailed {
                reason: format!("timeout {:?} is out of range", spec.timeout),
            };
        };
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %name, error = %err, "spawn failed");
                return ProcessOutcome::LaunchFailed {
                    reason: format!("failed to start {}: {}", program.display(), err),
                };
            }
        };
        debug!(
            program = %name,
            pid = child.id().unwrap_or(0),
            args = spec.args.len(),
            timeout = ?spec.timeout,
            "process started"
        );

        let mut stdout_drain: Drain = tokio::spawn(drain(child.stdout.take()));
        let mut stderr_drain: Drain = tokio::spawn(drain(child.stderr.take()));

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                self.terminate(&mut child).await;
                self.abandon(&mut stdout_drain, &mut stderr_drain).await;
                return ProcessOutcome::LaunchFailed {
                    reason: format!("failed to wait for {name}: {err}"),
                };
            }
            Err(_) => {
                warn!(program = %name, timeout = ?spec.timeout, "deadline elapsed; killing process");
                self.terminate(&mut child).await;
                self.abandon(&mut stdout_drain, &mut stderr_drain).await;
                return ProcessOutcome::TimedOut;
            }
        };

        // The child is gone but a descendant may still hold the pipes open.
        let joined = timeout_at(deadline, async {
            tokio::join!(&mut stdout_drain, &mut stderr_drain)
        })
        .await;

        let (stdout, stderr) = match joined {
            Ok(pair) => pair,
            Err(_) => {
                warn!(program = %name, "output pipes still open at deadline");
                stdout_drain.abort();
                stderr_drain.abort();
                return ProcessOutcome::TimedOut;
            }
        };

        match (captured("stdout", stdout), captured("stderr", stderr)) {
            (Ok(stdout), Ok(stderr)) => {
                let exit_code = status.code().unwrap_or(-1);
                debug!(
                    program = %name,
                    exit_code,
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    "process completed"
                );
                ProcessOutcome::Completed {
                    stdout,
                    stderr,
                    exit_code,
                }
            }
            (Err(reason), _) | (_, Err(reason)) => ProcessOutcome::LaunchFailed { reason },
        }
    }

    /// Sends SIGKILL (TerminateProcess on Windows) and reaps the child.
    async fn terminate(&self, child: &mut Child) {
        match timeout(self.drain_grace, child.kill()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "kill returned an error; child likely already exited"),
            Err(_) => warn!("child not reaped within grace period after kill"),
        }
    }

    /// Gives both drains the grace period to flush, then cancels whatever is left.
    async fn abandon(&self, stdout_drain: &mut Drain, stderr_drain: &mut Drain) {
        let grace = self.drain_grace;
        let (out, err) = tokio::join!(
            timeout(grace, &mut *stdout_drain),
            timeout(grace, &mut *stderr_drain)
        );
        if out.is_err() {
            stdout_drain.abort();
            debug!("stdout drain abandoned");
        }
        if err.is_err() {
            stderr_drain.abort();
            debug!("stderr drain abandoned");
        }
    }
}

impl Executor for SystemExecutor {
    fn execute(&self, spec: ProcessSpec) -> BoxFuture<'_, ProcessOutcome> {
        Box::pin(self.run(spec))
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn captured(
    stream: &str,
    joined: std::result::Result<io::Result<Vec<u8>>, JoinError>,
) -> std::result::Result<Vec<u8>, String> {
    match joined {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(err)) => Err(format!("failed to read {stream}: {err}")),
        Err(err) => Err(format!("{stream} capture task failed: {err}")),
    }
}
