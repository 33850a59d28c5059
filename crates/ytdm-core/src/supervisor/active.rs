//! Active-process map: job id -> running child, plus termination requests.
//!
//! The supervisor loop owns each `Child`; everything else (watchdog, shutdown)
//! talks to it through a [`ProcessControl`]. A request records the first
//! [`Termination`] reason and wakes the loop, which then runs the
//! graceful-then-forceful sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use super::Termination;
use crate::registry::JobId;

/// Shared between the supervisor loop and whoever asks it to stop.
#[derive(Debug, Default)]
pub(crate) struct ProcessControl {
    reason: OnceLock<Termination>,
    stop: Notify,
}

impl ProcessControl {
    /// Records `reason` (first request wins) and wakes the supervisor loop.
    pub(crate) fn request(&self, reason: Termination) {
        let _ = self.reason.set(reason);
        self.stop.notify_one();
    }

    pub(crate) fn reason(&self) -> Option<Termination> {
        self.reason.get().copied()
    }

    pub(crate) async fn stopped(&self) {
        self.stop.notified().await;
    }
}

struct ProcessHandle {
    pid: Option<u32>,
    attempt: u64,
    control: Arc<ProcessControl>,
}

#[derive(Default)]
pub(crate) struct ActiveProcesses {
    handles: Mutex<HashMap<JobId, ProcessHandle>>,
    /// Set by [`ActiveProcesses::request_all`]; later registrations are
    /// asked to stop with the same reason. Only touched under `handles`.
    closed: OnceLock<Termination>,
    attempts: AtomicU64,
    changed: Notify,
}

impl ActiveProcesses {
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, ProcessHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a spawned child. The returned guard deregisters it on drop.
    /// After `request_all`, the new control is already asked to stop.
    pub(crate) fn register(
        self: &Arc<Self>,
        id: &JobId,
        pid: Option<u32>,
    ) -> (ActiveGuard, Arc<ProcessControl>) {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        let control = Arc::new(ProcessControl::default());
        let mut handles = self.lock();
        handles.insert(
            id.clone(),
            ProcessHandle {
                pid,
                attempt,
                control: Arc::clone(&control),
            },
        );
        if let Some(&reason) = self.closed.get() {
            tracing::info!(job_id = %id, pid = ?pid, "registered after close, terminating");
            control.request(reason);
        }
        drop(handles);
        let guard = ActiveGuard {
            active: Arc::clone(self),
            id: id.clone(),
            attempt,
        };
        (guard, control)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn contains(&self, id: &JobId) -> bool {
        self.lock().contains_key(id)
    }

    #[cfg(test)]
    fn pid(&self, id: &JobId) -> Option<u32> {
        self.lock().get(id).and_then(|h| h.pid)
    }

    /// Asks the process registered for `id` to stop, if it is still the
    /// given attempt. Returns whether a request was sent.
    pub(crate) fn terminate_attempt(&self, id: &JobId, attempt: u64, reason: Termination) -> bool {
        match self.lock().get(id) {
            Some(h) if h.attempt == attempt => {
                h.control.request(reason);
                true
            }
            _ => false,
        }
    }

    /// Asks every registered process, and any registered from now on, to
    /// stop. Returns how many were registered at the call.
    pub fn request_all(&self, reason: Termination) -> usize {
        let handles = self.lock();
        let _ = self.closed.set(reason);
        for (id, h) in handles.iter() {
            tracing::info!(job_id = %id, pid = ?h.pid, "terminating active process");
            h.control.request(reason);
        }
        handles.len()
    }

    /// Waits until no process is registered, or `timeout` elapses.
    /// Returns true if the map drained.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let changed = self.changed.notified();
            if self.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return self.is_empty();
            }
        }
    }

    fn deregister(&self, id: &JobId, attempt: u64) {
        let mut handles = self.lock();
        if handles.get(id).is_some_and(|h| h.attempt == attempt) {
            handles.remove(id);
        }
        drop(handles);
        self.changed.notify_waiters();
    }
}

/// Removes the process from the active map when dropped.
pub(crate) struct ActiveGuard {
    active: Arc<ActiveProcesses>,
    id: JobId,
    attempt: u64,
}

impl ActiveGuard {
    pub(crate) fn attempt(&self) -> u64 {
        self.attempt
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.deregister(&self.id, self.attempt);
    }
}

/// Sends SIGTERM to the child's process group.
#[cfg(unix)]
pub(crate) fn signal_graceful(pid: Option<u32>) {
    signal_group(pid, libc::SIGTERM);
}

/// Sends SIGKILL to the child's process group.
#[cfg(unix)]
pub(crate) fn signal_force(pid: Option<u32>) {
    signal_group(pid, libc::SIGKILL);
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: libc::c_int) {
    let Some(pid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return;
    };
    // The child was spawned as its own group leader, so -pid reaches the
    // whole tree (e.g. a merger subprocess).
    unsafe {
        libc::kill(-pid, signal);
    }
}

#[cfg(not(unix))]
pub(crate) fn signal_graceful(_pid: Option<u32>) {}

#[cfg(not(unix))]
pub(crate) fn signal_force(_pid: Option<u32>) {}
