//! Browser subprocess supervision.
//!
//! The [`ProcessSupervisor`] owns the headless-browser subprocess for one
//! session: it launches the process, watches it for exit, and kills it on
//! session close. The exit notice distinguishes a requested shutdown from
//! a crash so the session can fail queued commands with the right error
//! ([`Error::SessionClosed`](crate::Error::SessionClosed) vs
//! [`Error::SubprocessCrashed`](crate::Error::SubprocessCrashed)).
//!
//! A crashed subprocess is not restarted in place: the session stays
//! failed until a new session is created.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// How long `shutdown` waits for the subprocess to die before giving up.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ProcessExit
// ============================================================================

/// Terminal state of the supervised subprocess.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExit {
    /// Exit code, if the OS reported one.
    pub code: Option<i32>,
    /// `true` if the exit was requested via [`ProcessSupervisor::shutdown`]
    /// (or supervisor drop); `false` means the subprocess crashed.
    pub requested: bool,
}

impl ProcessExit {
    /// Converts the exit notice into the session-level error it implies.
    #[inline]
    #[must_use]
    pub fn to_error(self) -> Error {
        if self.requested {
            Error::SessionClosed
        } else {
            Error::crashed(self.code)
        }
    }
}

// ============================================================================
// SupervisorMsg
// ============================================================================

/// Internal messages for the monitor task.
enum SupervisorMsg {
    /// Kill the subprocess; ack after it has exited.
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// ProcessSupervisor
// ============================================================================

/// Supervises one headless-browser subprocess.
///
/// The monitor task owns the [`Child`] handle; the supervisor communicates
/// with it over a control channel and publishes the exit notice through a
/// watch channel that the session subscribes to.
pub struct ProcessSupervisor {
    /// Process ID for logging.
    pid: u32,
    /// Control channel to the monitor task.
    control_tx: mpsc::UnboundedSender<SupervisorMsg>,
    /// Exit notice, `None` while the subprocess is alive.
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessSupervisor {
    /// Launches the subprocess and starts supervising it.
    ///
    /// stdio is suppressed; the control protocol runs over the transport
    /// channel, not the process's pipes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaunchFailed`] if the process fails to spawn.
    pub fn launch(binary: &Path, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().map_err(Error::launch_failed)?;
        let pid = child.id().unwrap_or(0);

        info!(pid, binary = %binary.display(), "Browser subprocess spawned");

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        tokio::spawn(Self::monitor(child, pid, control_rx, exit_tx));

        Ok(Self {
            pid,
            control_tx,
            exit_rx,
        })
    }

    /// Returns the subprocess PID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns a watch receiver resolving to the exit notice.
    #[inline]
    #[must_use]
    pub fn exit_watch(&self) -> watch::Receiver<Option<ProcessExit>> {
        self.exit_rx.clone()
    }

    /// Returns the exit notice if the subprocess has already terminated.
    #[inline]
    #[must_use]
    pub fn exit_notice(&self) -> Option<ProcessExit> {
        *self.exit_rx.borrow()
    }

    /// Kills the subprocess and waits for it to exit.
    ///
    /// Idempotent; returns once the process is gone (or after a grace
    /// timeout if the OS never reports the exit).
    pub async fn shutdown(&self) {
        if self.exit_notice().is_some() {
            return;
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control_tx.send(SupervisorMsg::Shutdown(ack_tx)).is_err() {
            // Monitor already finished; exit notice is set.
            return;
        }

        if timeout(SHUTDOWN_TIMEOUT, ack_rx).await.is_err() {
            warn!(pid = self.pid, "Timed out waiting for subprocess exit");
        }
    }

    /// Monitor task: waits for child exit, handles shutdown requests.
    async fn monitor(
        mut child: Child,
        pid: u32,
        mut control_rx: mpsc::UnboundedReceiver<SupervisorMsg>,
        exit_tx: watch::Sender<Option<ProcessExit>>,
    ) {
        let mut requested = false;
        let mut acks: Vec<oneshot::Sender<()>> = Vec::new();
        let mut control_open = true;

        let status = loop {
            if control_open {
                tokio::select! {
                    status = child.wait() => break status,

                    msg = control_rx.recv() => match msg {
                        Some(SupervisorMsg::Shutdown(ack)) => {
                            requested = true;
                            acks.push(ack);
                            if let Err(e) = child.start_kill() {
                                debug!(pid, error = %e, "Failed to send kill signal");
                            }
                        }
                        None => {
                            // Supervisor handle dropped without close();
                            // treat as a requested shutdown, not a crash.
                            requested = true;
                            control_open = false;
                            if let Err(e) = child.start_kill() {
                                debug!(pid, error = %e, "Failed to send kill signal");
                            }
                        }
                    }
                }
            } else {
                break child.wait().await;
            }
        };

        let code = status.ok().and_then(|s| s.code());
        let notice = ProcessExit { code, requested };

        if requested {
            info!(pid, ?code, "Subprocess terminated");
        } else {
            warn!(pid, ?code, "Subprocess crashed");
        }

        let _ = exit_tx.send(Some(notice));
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

// Dropping the supervisor closes the control channel; the monitor task
// then kills the child and records a requested exit.

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn shell() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn test_requested_shutdown_is_not_a_crash() {
        let supervisor = ProcessSupervisor::launch(&shell(), &["-c".into(), "sleep 30".into()])
            .expect("launch");

        supervisor.shutdown().await;

        let notice = supervisor.exit_notice().expect("exit notice");
        assert!(notice.requested);
        assert!(matches!(notice.to_error(), Error::SessionClosed));
    }

    #[tokio::test]
    async fn test_natural_exit_is_a_crash() {
        let supervisor = ProcessSupervisor::launch(&shell(), &["-c".into(), "exit 3".into()])
            .expect("launch");

        let mut exit_rx = supervisor.exit_watch();
        exit_rx
            .wait_for(Option::is_some)
            .await
            .expect("exit notice");

        let notice = supervisor.exit_notice().expect("exit notice");
        assert!(!notice.requested);
        assert_eq!(notice.code, Some(3));
        assert!(matches!(
            notice.to_error(),
            Error::SubprocessCrashed { exit_code: Some(3) }
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let supervisor = ProcessSupervisor::launch(&shell(), &["-c".into(), "sleep 30".into()])
            .expect("launch");

        supervisor.shutdown().await;
        supervisor.shutdown().await;

        assert!(supervisor.exit_notice().is_some());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let result = ProcessSupervisor::launch(Path::new("/nonexistent/browser"), &[]);
        assert!(matches!(result, Err(Error::LaunchFailed { .. })));
    }
}
