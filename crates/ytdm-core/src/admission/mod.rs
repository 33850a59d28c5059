//! Admission control: concurrency slots, queue delay, and launch pacing.
//!
//! Each job holds a [`Slot`] for as long as it is `downloading`; dropping the
//! slot frees it for a queued job. Independently, every external launch goes
//! through [`AdmissionController::pace_launch`], which serializes launches
//! and enforces the escalating cool-down, and every metadata lookup goes
//! through [`AdmissionController::pace_lookup`].

mod pacer;

pub use pacer::{escalation_factor, CooldownPolicy, LaunchPacer, SpacingPacer};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::AdmissionConfig;

/// A held concurrency slot. Released when dropped.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Outcome of an admission decision.
#[derive(Debug)]
pub enum Admission {
    /// A slot was free; the job starts now.
    RunNow(Slot),
    /// All slots busy; wait this long, then wait for a slot.
    RunAfter(Duration),
}

pub struct AdmissionController {
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    queue_delay: Duration,
    launches: Mutex<LaunchPacer>,
    lookups: Mutex<SpacingPacer>,
}

impl AdmissionController {
    pub fn new(cfg: &AdmissionConfig) -> Self {
        let max_concurrent = cfg.max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            queue_delay: cfg.queue_delay,
            launches: Mutex::new(LaunchPacer::new(CooldownPolicy {
                base: cfg.base_cooldown,
                jitter: cfg.cooldown_jitter,
            })),
            lookups: Mutex::new(SpacingPacer::new(cfg.lookup_spacing)),
        }
    }

    /// Decides whether a new job runs now or is deferred.
    pub fn admit(&self) -> Admission {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Admission::RunNow(Slot { _permit: permit }),
            Err(_) => Admission::RunAfter(self.queue_delay),
        }
    }

    /// Waits for a free slot. Returns None once the controller is closed.
    pub async fn wait_for_slot(&self) -> Option<Slot> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .ok()
            .map(|permit| Slot { _permit: permit })
    }

    /// Number of slots currently held (jobs in `downloading`).
    pub fn in_use(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.slots.available_permits())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Wakes every queued waiter with None; further admissions are deferred.
    pub fn close(&self) {
        self.slots.close();
    }

    /// Waits out the escalating cool-down before an external launch.
    /// Launches are serialized: the pacer stays locked across the wait so
    /// two jobs can never both slip under the spacing. Returns the launch
    /// number.
    pub async fn pace_launch(&self) -> u32 {
        let mut pacer = self.launches.lock().await;
        let (launch, wait) = {
            let mut rng = rand::thread_rng();
            pacer.next_wait(Instant::now(), &mut rng)
        };
        if !wait.is_zero() {
            tracing::info!(
                launch,
                "anti-detection cooldown: waiting {:.1}s",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
        pacer.mark(Instant::now());
        launch
    }

    /// Waits out the fixed spacing before a metadata lookup.
    pub async fn pace_lookup(&self) {
        let mut pacer = self.lookups.lock().await;
        let wait = pacer.next_wait(Instant::now());
        if !wait.is_zero() {
            tracing::info!(
                "rate limiting: waiting {:.1}s before video info request",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
        pacer.mark(Instant::now());
    }
}
