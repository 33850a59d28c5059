//! Download engine: owns the registry, admission, and supervisor, and runs
//! each submitted job as its own task.
//!
//! [`Engine`] is a cheap handle; clone it freely. Construct one per process
//! with [`Engine::start`] from inside a Tokio runtime, and call
//! [`Engine::shutdown`] before exit.

mod fallback;
mod job;
mod locate;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::admission::{Admission, AdmissionController};
use crate::config::YtdmConfig;
use crate::error::EngineError;
use crate::info::{parse_video_info, VideoInfo, MAX_INFO_BYTES};
use crate::parser::{classify_diagnostics, push_tail, FailureKind};
use crate::registry::{Job, JobId, JobPatch, JobRegistry, JobStatus};
use crate::request::{clean_url, is_supported_url, lookup_args, DownloadRequest};
use crate::supervisor::{Invocation, StreamKind, Supervisor, Termination};

const QUEUED_LABEL: &str = "Waiting in queue...";
const PREPARING_LABEL: &str = "Preparing download...";
/// Stderr tail kept from a lookup for failure classification.
const MAX_LOOKUP_STDERR: usize = 8 * 1024;

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    config: YtdmConfig,
    registry: JobRegistry,
    admission: AdmissionController,
    supervisor: Supervisor,
    default_dir: PathBuf,
    runtime: Handle,
    closing: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Builds the engine and starts the retention sweep on the current
    /// runtime.
    pub fn start(config: YtdmConfig) -> Result<Self, EngineError> {
        let runtime = Handle::try_current()?;
        let default_dir = config
            .download_dir
            .clone()
            .unwrap_or_else(default_download_dir);
        let inner = Arc::new(EngineInner {
            registry: JobRegistry::new(),
            admission: AdmissionController::new(&config.admission),
            supervisor: Supervisor::new(),
            default_dir,
            runtime,
            closing: AtomicBool::new(false),
            sweeper: Mutex::new(None),
            config,
        });

        let sweeper = inner.runtime.spawn(sweep_loop(
            Arc::downgrade(&inner),
            inner.config.retention.sweep_interval,
            inner.config.retention.max_jobs,
        ));
        *inner.sweeper.lock().unwrap_or_else(PoisonError::into_inner) = Some(sweeper);

        info!(
            downloader = ?inner.config.downloader,
            download_dir = %inner.default_dir.display(),
            max_concurrent = inner.admission.max_concurrent(),
            "engine started"
        );
        Ok(Self { inner })
    }

    /// Validates and registers a download, then runs it in the background.
    /// Never waits for the download itself.
    pub fn submit(&self, request: DownloadRequest) -> Result<JobId, EngineError> {
        let inner = &self.inner;
        if inner.is_closing() {
            return Err(EngineError::ShuttingDown);
        }
        if !is_supported_url(&request.url) {
            return Err(EngineError::InvalidUrl(request.url));
        }
        if let Some(dir) = request.requested_dir() {
            if dir.is_file() {
                return Err(EngineError::InvalidRequest(format!(
                    "output path {} is a file",
                    dir.display()
                )));
            }
        }

        let id = JobId::generate("dl");
        let admission = inner.admission.admit();
        let (status, label) = match admission {
            Admission::RunNow(_) => (JobStatus::Downloading, PREPARING_LABEL),
            Admission::RunAfter(_) => (JobStatus::Queued, QUEUED_LABEL),
        };
        let mut record = Job::new(id.clone(), request.url.clone(), status);
        record.filename = Some(label.to_string());
        inner.registry.put(record);
        info!(job_id = %id, url = %request.url, status = status.as_str(), "download submitted");

        let task_inner = Arc::clone(inner);
        let task_id = id.clone();
        inner.runtime.spawn(async move {
            job::run(task_inner, task_id, request, admission).await;
        });
        Ok(id)
    }

    /// Snapshot of a job, if it is still tracked.
    pub fn status(&self, id: &JobId) -> Option<Job> {
        self.inner.registry.get(id)
    }

    /// Looks up video metadata without downloading.
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo, EngineError> {
        self.inner.video_info(url).await
    }

    /// Terminates every active process, stops the sweep, and forgets all
    /// jobs. Further submissions fail with `ShuttingDown`. Idempotent.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("engine shutdown initiated");
        if let Some(sweeper) = inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            sweeper.abort();
        }
        inner.admission.close();
        let terminated = inner
            .supervisor
            .terminate_all(inner.config.timeouts.kill_grace)
            .await;
        inner.registry.clear();
        info!(terminated, "engine shutdown complete");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.is_closing()
    }

    /// Processes currently registered with the supervisor.
    pub fn active_process_count(&self) -> usize {
        self.inner.supervisor.active_count()
    }

    /// Jobs currently holding an admission slot.
    pub fn downloading_count(&self) -> usize {
        self.inner.admission.in_use()
    }

    pub fn job_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn default_download_dir(&self) -> &Path {
        &self.inner.default_dir
    }
}

impl EngineInner {
    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Downloader argv: configured prefix followed by `args`.
    fn invocation(
        &self,
        args: Vec<OsString>,
        working_dir: Option<PathBuf>,
        hard_timeout: Duration,
        watchdog: Duration,
        kill_grace: Duration,
    ) -> Invocation {
        let (program, prefix) = self.config.downloader_command();
        let mut argv: Vec<OsString> = prefix.iter().map(OsString::from).collect();
        argv.extend(args);
        Invocation {
            program: program.into(),
            args: argv,
            working_dir,
            hard_timeout,
            watchdog,
            kill_grace,
        }
    }

    async fn video_info(&self, url: &str) -> Result<VideoInfo, EngineError> {
        if self.is_closing() {
            return Err(EngineError::ShuttingDown);
        }
        if !is_supported_url(url) {
            return Err(EngineError::InvalidUrl(url.to_string()));
        }
        self.admission.pace_lookup().await;
        if self.is_closing() {
            return Err(EngineError::ShuttingDown);
        }

        let url = clean_url(url);
        let id = JobId::generate("info");
        info!(lookup_id = %id, url = %url, "fetching video info");
        let timeouts = &self.config.timeouts;
        let inv = self.invocation(
            lookup_args(&url),
            None,
            timeouts.lookup_hard,
            timeouts.lookup_watchdog,
            timeouts.lookup_kill_grace,
        );

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut overflow = false;
        let outcome = self
            .supervisor
            .run(&id, &inv, |kind, line| match kind {
                StreamKind::Stdout => {
                    if stdout.len() + line.len() + 1 > MAX_INFO_BYTES {
                        overflow = true;
                    } else {
                        stdout.push_str(line);
                        stdout.push('\n');
                    }
                }
                StreamKind::Stderr => {
                    debug!(lookup_id = %id, "yt-dlp stderr: {line}");
                    push_tail(&mut stderr, line, MAX_LOOKUP_STDERR);
                }
            })
            .await?;

        match outcome.termination {
            Some(Termination::Shutdown) => return Err(EngineError::ShuttingDown),
            Some(Termination::HardTimeout | Termination::Watchdog) => {
                warn!(lookup_id = %id, "video info request timed out");
                return Err(EngineError::Timeout);
            }
            None => {}
        }
        if outcome.code != Some(0) {
            warn!(lookup_id = %id, code = ?outcome.code, "video info lookup failed: {}", stderr.trim());
            let failure = classify_diagnostics(
                &stderr,
                &format!("lookup exited with code {:?}", outcome.code),
            );
            return Err(match failure.kind {
                FailureKind::Forbidden => EngineError::Forbidden,
                FailureKind::NotFound => EngineError::NotFound,
                FailureKind::Network => EngineError::Network,
                FailureKind::Generic => EngineError::LookupFailed(failure.message),
            });
        }
        if overflow {
            return Err(EngineError::InvalidInfo(format!(
                "output exceeded {MAX_INFO_BYTES} bytes"
            )));
        }
        parse_video_info(&stdout)
    }

    fn finish(&self, id: &JobId, patch: JobPatch) {
        if !self.registry.update(id, patch) {
            debug!(job_id = %id, "job already finished or evicted");
        }
    }
}

async fn sweep_loop(inner: Weak<EngineInner>, interval: Duration, max_jobs: usize) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let evicted = inner.registry.sweep(max_jobs);
        if evicted > 0 {
            debug!(evicted, remaining = inner.registry.len(), "retention sweep");
        }
    }
}

/// The user's download directory: the OS download dir, else `~/Downloads`,
/// else home, else the current directory.
pub fn default_download_dir() -> PathBuf {
    if let Some(dir) = dirs::download_dir() {
        return dir;
    }
    if let Some(home) = dirs::home_dir() {
        let downloads = home.join("Downloads");
        if downloads.is_dir() {
            return downloads;
        }
        return home;
    }
    PathBuf::from(".")
}
