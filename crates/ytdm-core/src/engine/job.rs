//! One download job, from admission to its terminal status.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::locate::{find_output, ExpectedOutput};
use super::{fallback, EngineInner, PREPARING_LABEL};
use crate::admission::Admission;
use crate::parser::{classify_diagnostics, FailureKind, OutputUpdate, ProgressParser};
use crate::registry::{JobErrorKind, JobId, JobPatch, JobStatus, ProgressChange};
use crate::request::{clean_url, download_args, sanitize_title, DownloadRequest};
use crate::supervisor::{ExitClass, StreamKind, Termination, BLOCKED_EXIT_CODE};

const SHUTDOWN_MESSAGE: &str = "Download cancelled: engine shutting down";

/// Terminal result of a job, applied to the registry exactly once.
#[derive(Debug)]
pub(super) enum Resolution {
    Completed(PathBuf),
    Failed(JobErrorKind, String),
}

impl Resolution {
    pub(super) fn shutdown() -> Self {
        Resolution::Failed(JobErrorKind::Shutdown, SHUTDOWN_MESSAGE.to_string())
    }

    fn timed_out(after: std::time::Duration) -> Self {
        Resolution::Failed(
            JobErrorKind::Timeout,
            format!("Download timed out after {after:?}"),
        )
    }
}

pub(super) async fn run(inner: Arc<EngineInner>, id: JobId, request: DownloadRequest, admission: Admission) {
    let slot = match admission {
        Admission::RunNow(slot) => Some(slot),
        Admission::RunAfter(delay) => {
            debug!(job_id = %id, "queued, retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
            inner.admission.wait_for_slot().await
        }
    };
    // Held until the terminal status is recorded.
    let resolution = match &slot {
        Some(_) => {
            let mut patch = JobPatch::status(JobStatus::Downloading);
            patch.filename = Some(PREPARING_LABEL.to_string());
            inner.registry.update(&id, patch);
            attempt(&inner, &id, &request).await
        }
        None => Resolution::shutdown(),
    };

    let patch = match resolution {
        Resolution::Completed(path) => {
            info!(job_id = %id, path = %path.display(), "download completed");
            JobPatch::completed(path)
        }
        Resolution::Failed(kind, message) => {
            error!(job_id = %id, kind = ?kind, "download failed: {message}");
            JobPatch::failed(kind, message)
        }
    };
    inner.finish(&id, patch);
    drop(slot);
}

/// Maps one parser update onto a registry patch.
fn patch_for(update: OutputUpdate) -> Option<JobPatch> {
    match update {
        OutputUpdate::Progress(p) => Some(JobPatch::progress(ProgressChange::Advance(p))),
        OutputUpdate::MergeHold => Some(JobPatch::progress(ProgressChange::MergeHold)),
        OutputUpdate::Speed(speed) => Some(JobPatch {
            speed: Some(speed),
            ..JobPatch::default()
        }),
        OutputUpdate::Eta(eta) => Some(JobPatch {
            eta: Some(eta),
            ..JobPatch::default()
        }),
        OutputUpdate::Destination(_) | OutputUpdate::Diagnostic { .. } => None,
    }
}

/// Feeds a stdout line through the parser into the registry.
pub(super) fn apply_stdout(inner: &EngineInner, id: &JobId, parser: &mut ProgressParser, line: &str) {
    trace!(job_id = %id, "yt-dlp: {line}");
    for update in parser.on_stdout(line) {
        match &update {
            OutputUpdate::MergeHold => info!(job_id = %id, "merging video and audio formats"),
            OutputUpdate::Destination(path) => {
                debug!(job_id = %id, path = %path.display(), "output path reported")
            }
            _ => {}
        }
        if let Some(patch) = patch_for(update) {
            inner.registry.update(id, patch);
        }
    }
}

/// Feeds a stderr line through the parser, logging error lines.
pub(super) fn apply_stderr(id: &JobId, parser: &mut ProgressParser, line: &str) {
    let updates = parser.on_stderr(line);
    if updates.is_empty() {
        debug!(job_id = %id, "yt-dlp stderr: {line}");
    }
    for update in updates {
        if let OutputUpdate::Diagnostic { suspected_block } = update {
            error!(job_id = %id, "yt-dlp error: {line}");
            if suspected_block {
                warn!(job_id = %id, "possible anti-automation detection: {line}");
            }
        }
    }
}

async fn attempt(inner: &EngineInner, id: &JobId, request: &DownloadRequest) -> Resolution {
    let launch = inner.admission.pace_launch().await;
    if inner.is_closing() {
        return Resolution::shutdown();
    }
    debug!(job_id = %id, launch, "launch slot granted");

    let dir = request.output_dir(&inner.default_dir);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        return Resolution::Failed(
            JobErrorKind::Launch,
            format!("Failed to start download: cannot create {}: {e}", dir.display()),
        );
    }

    let info = match inner.video_info(&request.url).await {
        Ok(info) => info,
        Err(e) => return Resolution::Failed(e.job_error_kind(), e.to_string()),
    };
    let url = clean_url(&request.url);
    let filename = request.output_filename(&info.title);
    let expected = ExpectedOutput {
        path: dir.join(&filename),
        stem: sanitize_title(&info.title),
        extension: request.extension(),
        dir,
    };
    info!(job_id = %id, file = %expected.path.display(), "video will be saved as {filename}");
    inner.registry.update(id, JobPatch::filename(filename));

    if inner.is_closing() {
        return Resolution::shutdown();
    }
    let timeouts = &inner.config.timeouts;
    let inv = inner.invocation(
        download_args(request, &expected.path, &url),
        Some(expected.dir.clone()),
        timeouts.download_hard,
        timeouts.download_watchdog,
        timeouts.kill_grace,
    );

    let mut parser = ProgressParser::new();
    let outcome = inner
        .supervisor
        .run(id, &inv, |kind, line| match kind {
            StreamKind::Stdout => apply_stdout(inner, id, &mut parser, line),
            StreamKind::Stderr => apply_stderr(id, &mut parser, line),
        })
        .await;
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            return Resolution::Failed(
                JobErrorKind::Launch,
                format!("Failed to start download: {}", e.source),
            )
        }
    };

    info!(
        job_id = %id,
        code = ?outcome.code,
        merging = parser.is_merging(),
        download_complete = parser.download_complete(),
        merge_complete = parser.merge_complete(),
        "download process closed"
    );
    match outcome.termination {
        Some(Termination::Shutdown) => return Resolution::shutdown(),
        Some(Termination::HardTimeout) => return Resolution::timed_out(timeouts.download_hard),
        Some(Termination::Watchdog) => return Resolution::timed_out(timeouts.download_watchdog),
        None => {}
    }

    let Some(code) = outcome.code else {
        return Resolution::Failed(
            JobErrorKind::Failed,
            "Download failed: process terminated by signal".to_string(),
        );
    };
    if code != 0 {
        error!(job_id = %id, code, "exit code analysis: {}", ExitClass::from_code(code).describe());
        if parser.has_error() {
            error!(job_id = %id, "error details: {}", parser.diagnostics());
        }
    }

    if code == 0 || code == BLOCKED_EXIT_CODE {
        let reported = parser.output_path().map(PathBuf::as_path);
        if let Some(path) = find_output(reported, &expected).await {
            if parser.merge_pending() {
                warn!(job_id = %id, "process ended but merge may not be complete");
            }
            return Resolution::Completed(path);
        }
        error!(job_id = %id, dir = %expected.dir.display(), "file not found after download");
    }

    match code {
        0 => Resolution::Failed(
            JobErrorKind::FileMissing,
            "Download seemed successful but file not found".to_string(),
        ),
        BLOCKED_EXIT_CODE => fallback::run(inner, id, request, &expected.path, &url).await,
        _ => {
            let failure = classify_diagnostics(
                parser.diagnostics(),
                &format!("Download failed with code {code}"),
            );
            let kind = match failure.kind {
                FailureKind::Forbidden => JobErrorKind::Forbidden,
                FailureKind::NotFound => JobErrorKind::NotFound,
                FailureKind::Network => JobErrorKind::Timeout,
                FailureKind::Generic => JobErrorKind::Failed,
            };
            Resolution::Failed(kind, failure.message)
        }
    }
}
