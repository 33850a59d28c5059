//! Job record and the merge rules applied to it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque job identifier, `<prefix>_<unix millis>_<9 base36 chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate(prefix: &str) -> Self {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        JobId(format!("{}_{}_{}", prefix, unix_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Job status. Transitions only move forward: queued -> downloading ->
/// completed | error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Downloading => 1,
            JobStatus::Completed | JobStatus::Error => 2,
        }
    }
}

/// Machine-readable failure class stored alongside `Job::error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// The downloader could not be started (or the output dir created).
    Launch,
    /// Metadata lookup before the download failed.
    Lookup,
    /// Video unavailable or private.
    Forbidden,
    /// Video not found.
    NotFound,
    /// Network trouble or a supervisor timeout.
    Timeout,
    /// Automation detected and the fallback did not help.
    Blocked,
    /// Any other non-zero exit.
    Failed,
    /// Exit 0 but the output file could not be located.
    FileMissing,
    /// Engine shut down before the job finished.
    Shutdown,
}

/// One download attempt as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<JobErrorKind>,
    pub created_at: u64,
}

impl Job {
    pub fn new(id: JobId, url: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id,
            url: url.into(),
            status,
            progress: 0.0,
            speed: None,
            eta: None,
            filename: None,
            file_path: None,
            error: None,
            error_kind: None,
            created_at: unix_millis(),
        }
    }

    /// Merges `patch` into the job. Returns false (and changes nothing) when
    /// the job is already terminal or the patch would move status backwards.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(next) = patch.status {
            if next.rank() < self.status.rank() {
                return false;
            }
            if next == JobStatus::Completed && patch.file_path.is_none() {
                return false;
            }
        }

        match patch.progress {
            Some(ProgressChange::Advance(p)) => {
                let p = p.clamp(0.0, 100.0);
                if p > self.progress {
                    self.progress = p;
                }
            }
            Some(ProgressChange::MergeHold) => self.progress = 99.0,
            None => {}
        }
        if let Some(speed) = patch.speed {
            self.speed = Some(speed);
        }
        if let Some(eta) = patch.eta {
            self.eta = Some(eta);
        }
        if let Some(filename) = patch.filename {
            self.filename = Some(filename);
        }

        match patch.status {
            Some(JobStatus::Completed) => {
                self.status = JobStatus::Completed;
                self.progress = 100.0;
                self.file_path = patch.file_path;
            }
            Some(JobStatus::Error) => {
                self.status = JobStatus::Error;
                let (kind, message) = patch
                    .error
                    .unwrap_or((JobErrorKind::Failed, "Download failed".to_string()));
                self.error_kind = Some(kind);
                self.error = Some(message);
            }
            Some(status) => self.status = status,
            None => {}
        }
        true
    }
}

/// How a patch moves `progress`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressChange {
    /// Raise progress to this value; lower values are ignored.
    Advance(f64),
    /// Pin progress at 99 while formats are being merged.
    MergeHold,
}

/// Partial update merged into a job by [`Job::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<ProgressChange>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub filename: Option<String>,
    pub file_path: Option<PathBuf>,
    pub error: Option<(JobErrorKind, String)>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(change: ProgressChange) -> Self {
        Self {
            progress: Some(change),
            ..Self::default()
        }
    }

    pub fn filename(name: impl Into<String>) -> Self {
        Self {
            filename: Some(name.into()),
            ..Self::default()
        }
    }

    /// Terminal success; the path must already be confirmed to exist.
    pub fn completed(path: PathBuf) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            file_path: Some(path),
            ..Self::default()
        }
    }

    pub fn failed(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error: Some((kind, message.into())),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobId::from("dl_1_a"), "https://youtu.be/abc", JobStatus::Downloading)
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let id = JobId::generate("dl");
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "dl");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(JobId::generate("dl"), JobId::generate("dl"));
    }

    #[test]
    fn progress_never_decreases_on_advance() {
        let mut j = job();
        j.apply(JobPatch::progress(ProgressChange::Advance(45.2)));
        j.apply(JobPatch::progress(ProgressChange::Advance(10.0)));
        assert_eq!(j.progress, 45.2);
        j.apply(JobPatch::progress(ProgressChange::Advance(250.0)));
        assert_eq!(j.progress, 100.0);
    }

    #[test]
    fn merge_hold_pins_at_99() {
        let mut j = job();
        j.apply(JobPatch::progress(ProgressChange::Advance(100.0)));
        j.apply(JobPatch::progress(ProgressChange::MergeHold));
        assert_eq!(j.progress, 99.0);
    }

    #[test]
    fn completed_requires_path_and_sets_100() {
        let mut j = job();
        let bare = JobPatch::status(JobStatus::Completed);
        assert!(!j.apply(bare));
        assert_eq!(j.status, JobStatus::Downloading);

        assert!(j.apply(JobPatch::completed(PathBuf::from("/dl/a.mp4"))));
        assert_eq!(j.status, JobStatus::Completed);
        assert_eq!(j.progress, 100.0);
        assert_eq!(j.file_path.as_deref(), Some(std::path::Path::new("/dl/a.mp4")));
    }

    #[test]
    fn terminal_jobs_ignore_updates() {
        let mut j = job();
        assert!(j.apply(JobPatch::failed(JobErrorKind::NotFound, "Video not found")));
        assert!(!j.apply(JobPatch::completed(PathBuf::from("/dl/a.mp4"))));
        assert!(!j.apply(JobPatch::progress(ProgressChange::Advance(50.0))));
        assert_eq!(j.status, JobStatus::Error);
        assert_eq!(j.error.as_deref(), Some("Video not found"));
        assert_eq!(j.error_kind, Some(JobErrorKind::NotFound));
        assert_eq!(j.progress, 0.0);
    }

    #[test]
    fn status_does_not_move_backwards() {
        let mut j = job();
        assert!(!j.apply(JobPatch::status(JobStatus::Queued)));
        assert_eq!(j.status, JobStatus::Downloading);
    }

    #[test]
    fn job_serializes_camel_case() {
        let mut j = job();
        j.apply(JobPatch::completed(PathBuf::from("/dl/a.mp4")));
        let v = serde_json::to_value(&j).unwrap();
        assert_eq!(v["status"], "completed");
        assert_eq!(v["filePath"], "/dl/a.mp4");
        assert!(v.get("error").is_none());
    }
}
