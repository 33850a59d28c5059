//! In-memory job registry with a bounded retention policy.
//!
//! Jobs live for the process lifetime only. The engine is the sole writer;
//! callers read snapshots via [`JobRegistry::get`]. A periodic sweep evicts
//! the oldest finished jobs once the registry grows past its cap, so a
//! long-running service handling many requests keeps a flat footprint.

mod job;

pub use job::{Job, JobErrorKind, JobId, JobPatch, JobStatus, ProgressChange};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct JobEntry {
    seq: u64,
    job: Job,
}

#[derive(Default)]
struct RegistryInner {
    jobs: HashMap<JobId, JobEntry>,
    next_seq: u64,
}

/// Job id -> job record. Critical sections are short and never span an await.
#[derive(Default)]
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a new job. Returns false if the id is already present.
    pub fn put(&self, job: Job) -> bool {
        let mut inner = self.lock();
        if inner.jobs.contains_key(&job.id) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(job.id.clone(), JobEntry { seq, job });
        true
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.lock().jobs.get(id).map(|e| e.job.clone())
    }

    #[cfg(test)]
    fn contains(&self, id: &JobId) -> bool {
        self.lock().jobs.contains_key(id)
    }

    /// Merges `patch` into the job. No-op (false) if the id is absent or the
    /// job is already terminal.
    pub fn update(&self, id: &JobId, patch: JobPatch) -> bool {
        match self.lock().jobs.get_mut(id) {
            Some(entry) => entry.job.apply(patch),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn count_with_status(&self, status: JobStatus) -> usize {
        self.lock()
            .jobs
            .values()
            .filter(|e| e.job.status == status)
            .count()
    }

    pub fn clear(&self) {
        self.lock().jobs.clear();
    }

    /// Evicts the oldest completed/errored jobs until at most `max_jobs`
    /// remain. Queued and downloading jobs are never evicted, so the registry
    /// may stay above the cap while many jobs are in flight. Returns the
    /// number of evicted jobs.
    pub fn sweep(&self, max_jobs: usize) -> usize {
        let mut inner = self.lock();
        let total = inner.jobs.len();
        if total <= max_jobs {
            return 0;
        }

        let mut finished: Vec<(u64, JobId)> = inner
            .jobs
            .iter()
            .filter(|(_, e)| e.job.status.is_terminal())
            .map(|(id, e)| (e.seq, id.clone()))
            .collect();
        finished.sort_unstable_by_key(|(seq, _)| *seq);

        let excess = total - max_jobs;
        let mut evicted = 0;
        for (_, id) in finished.into_iter().take(excess) {
            inner.jobs.remove(&id);
            evicted += 1;
        }
        evicted
    }
}
