//! Process supervisor: spawns the external downloader and owns its lifetime.
//!
//! One [`Supervisor::run`] call is one attempt: spawn, register in the
//! active map, pump stdout/stderr lines to the caller in emission order,
//! enforce the hard timeout and the independent watchdog, and deregister
//! when the child exits. Termination is always SIGTERM to the process group,
//! then SIGKILL after the attempt's grace window.

mod active;
mod exit;
mod lines;

use active::ActiveProcesses;
pub use exit::{ExitClass, BLOCKED_EXIT_CODE};
pub use lines::LineSplitter;

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::registry::JobId;
use active::{signal_force, signal_graceful};

/// What to run and how long it may take.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub hard_timeout: Duration,
    pub watchdog: Duration,
    pub kill_grace: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Why the supervisor stopped a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    HardTimeout,
    Watchdog,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; None when the process died from a signal.
    pub code: Option<i32>,
    /// Set when the supervisor asked the process to stop.
    pub termination: Option<Termination>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0) && self.termination.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to start {program}: {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

#[derive(Clone, Default)]
pub struct Supervisor {
    active: Arc<ActiveProcesses>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Runs one attempt to completion. `on_line` sees every output line,
    /// stdout and stderr interleaved in arrival order.
    pub async fn run<F>(
        &self,
        id: &JobId,
        inv: &Invocation,
        mut on_line: F,
    ) -> Result<ProcessOutcome, SpawnError>
    where
        F: FnMut(StreamKind, &str),
    {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &inv.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| SpawnError {
            program: inv.program.to_string_lossy().into_owned(),
            source,
        })?;
        let pid = child.id();
        let (guard, control) = self.active.register(id, pid);
        debug!(job_id = %id, pid = ?pid, "spawned {:?}", inv.program);

        let (tx, mut rx) = mpsc::channel::<(StreamKind, String)>(256);
        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(out, StreamKind::Stdout, tx.clone())));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(err, StreamKind::Stderr, tx.clone())));
        }
        drop(tx);

        let watchdog = tokio::spawn(watchdog(
            Arc::clone(&self.active),
            id.clone(),
            guard.attempt(),
            inv.watchdog,
        ));

        let hard_deadline = Instant::now() + inv.hard_timeout;
        let mut kill_at: Option<Instant> = None;
        let mut timeout_requested = false;
        let mut forced = false;
        let mut stream_open = true;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                line = rx.recv(), if stream_open => match line {
                    Some((kind, line)) => on_line(kind, &line),
                    None => stream_open = false,
                },
                _ = sleep_until(hard_deadline), if kill_at.is_none() && !timeout_requested => {
                    warn!(job_id = %id, "process exceeded hard timeout of {:?}", inv.hard_timeout);
                    timeout_requested = true;
                    control.request(Termination::HardTimeout);
                }
                _ = control.stopped(), if kill_at.is_none() => {
                    debug!(job_id = %id, reason = ?control.reason(), "sending SIGTERM");
                    signal_graceful(pid);
                    kill_at = Some(Instant::now() + inv.kill_grace);
                }
                _ = sleep_until(kill_at.unwrap_or(hard_deadline)), if kill_at.is_some() && !forced => {
                    warn!(job_id = %id, "process ignored SIGTERM, killing");
                    signal_force(pid);
                    if let Err(e) = child.start_kill() {
                        debug!(job_id = %id, "start_kill: {e}");
                    }
                    forced = true;
                }
            }
        };
        watchdog.abort();
        drop(guard);

        let code = match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(job_id = %id, "failed to wait for child: {e}");
                None
            }
        };

        // Output written just before exit may still be in flight. Grandchildren
        // can keep the pipes open, so the drain is bounded.
        if stream_open {
            let drain_deadline = Instant::now() + inv.kill_grace;
            loop {
                match tokio::time::timeout_at(drain_deadline, rx.recv()).await {
                    Ok(Some((kind, line))) => on_line(kind, &line),
                    Ok(None) => break,
                    Err(_) => {
                        debug!(job_id = %id, "output still open after exit");
                        break;
                    }
                }
            }
        }
        for pump in pumps {
            pump.abort();
        }

        Ok(ProcessOutcome {
            code,
            termination: control.reason(),
        })
    }

    /// Asks every active process to stop and waits up to `grace` plus a
    /// short margin for them to exit. Returns how many were asked.
    pub async fn terminate_all(&self, grace: Duration) -> usize {
        let count = self.active.request_all(Termination::Shutdown);
        if count > 0 && !self.active.wait_idle(grace + Duration::from_secs(1)).await {
            warn!(
                remaining = self.active.len(),
                "processes still registered after termination"
            );
        }
        count
    }
}

async fn pump<R>(mut reader: R, kind: StreamKind, tx: mpsc::Sender<(StreamKind, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; 8 * 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    if tx.send((kind, line)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
    if let Some(line) = splitter.finish() {
        let _ = tx.send((kind, line)).await;
    }
}

async fn watchdog(active: Arc<ActiveProcesses>, id: JobId, attempt: u64, after: Duration) {
    tokio::time::sleep(after).await;
    if active.terminate_attempt(&id, attempt, Termination::Watchdog) {
        warn!(job_id = %id, "process still active after {:?}, terminating", after);
    }
}
