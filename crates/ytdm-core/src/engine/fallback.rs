//! Single minimal retry after the downloader reports it was blocked.

use std::path::Path;
use tracing::{error, info, warn};

use super::job::{apply_stderr, apply_stdout, Resolution};
use super::EngineInner;
use crate::parser::ProgressParser;
use crate::registry::{JobErrorKind, JobId};
use crate::request::{fallback_args, DownloadRequest};
use crate::supervisor::{StreamKind, Termination};

const BLOCKED_MESSAGE: &str =
    "YouTube blocked the download even with fallback strategy. Try again later with longer cooldown.";

/// Waits the fallback delay, then runs the downloader once more with only
/// the essential flags, straight to `expected`. Progress is coarse.
pub(super) async fn run(
    inner: &EngineInner,
    id: &JobId,
    request: &DownloadRequest,
    expected: &Path,
    url: &str,
) -> Resolution {
    let timeouts = &inner.config.timeouts;
    warn!(
        job_id = %id,
        "automation detection suspected (exit 255), retrying with fallback in {:?}",
        timeouts.fallback_delay
    );
    tokio::time::sleep(timeouts.fallback_delay).await;
    if inner.is_closing() {
        return Resolution::shutdown();
    }

    let inv = inner.invocation(
        fallback_args(request, expected, url),
        expected.parent().map(Path::to_path_buf),
        timeouts.fallback_hard,
        timeouts.download_watchdog,
        timeouts.kill_grace,
    );
    let mut parser = ProgressParser::coarse();
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
            error!(job_id = %id, "fallback failed to start: {e}");
            return Resolution::Failed(JobErrorKind::Blocked, BLOCKED_MESSAGE.to_string());
        }
    };
    info!(job_id = %id, code = ?outcome.code, "fallback process closed");
    if outcome.termination == Some(Termination::Shutdown) {
        return Resolution::shutdown();
    }

    if outcome.success() {
        let exists = tokio::fs::metadata(expected)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if exists {
            info!(job_id = %id, path = %expected.display(), "fallback download successful");
            return Resolution::Completed(expected.to_path_buf());
        }
        error!(job_id = %id, "fallback completed but file not found");
    } else if parser.has_error() {
        error!(job_id = %id, "fallback error: {}", parser.diagnostics());
    } else {
        error!(job_id = %id, "fallback failed with code {:?}", outcome.code);
    }
    Resolution::Failed(JobErrorKind::Blocked, BLOCKED_MESSAGE.to_string())
}
