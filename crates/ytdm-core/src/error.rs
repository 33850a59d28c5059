//! Errors returned across the engine's public boundary.

use crate::registry::JobErrorKind;
use crate::supervisor::SpawnError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("yt-dlp command failed to execute. Please ensure yt-dlp is installed. ({0})")]
    Spawn(#[from] SpawnError),

    #[error("Video is unavailable or private")]
    Forbidden,

    #[error("Video not found")]
    NotFound,

    #[error("Network error - unable to access video")]
    Network,

    #[error("Request timeout - video information could not be retrieved")]
    Timeout,

    #[error("Failed to get video information: {0}")]
    LookupFailed(String),

    #[error("No video information returned")]
    NoInfo,

    #[error("Invalid video information received: {0}")]
    InvalidInfo(String),

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("no Tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl EngineError {
    /// Status code an HTTP front end would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::InvalidRequest(_)
            | EngineError::InvalidUrl(_)
            | EngineError::LookupFailed(_)
            | EngineError::InvalidInfo(_) => 400,
            EngineError::Forbidden => 403,
            EngineError::NotFound | EngineError::NoInfo => 404,
            EngineError::Network | EngineError::Timeout => 408,
            EngineError::Spawn(_) | EngineError::Runtime(_) => 500,
            EngineError::ShuttingDown => 503,
        }
    }

    /// Job error kind when this error ends a download job.
    pub fn job_error_kind(&self) -> JobErrorKind {
        match self {
            EngineError::Spawn(_) | EngineError::Runtime(_) => JobErrorKind::Launch,
            EngineError::Forbidden => JobErrorKind::Forbidden,
            EngineError::NotFound | EngineError::NoInfo => JobErrorKind::NotFound,
            EngineError::Network | EngineError::Timeout => JobErrorKind::Timeout,
            EngineError::ShuttingDown => JobErrorKind::Shutdown,
            EngineError::InvalidRequest(_)
            | EngineError::InvalidUrl(_)
            | EngineError::LookupFailed(_)
            | EngineError::InvalidInfo(_) => JobErrorKind::Lookup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(EngineError::InvalidUrl("x".into()).http_status(), 400);
        assert_eq!(EngineError::Forbidden.http_status(), 403);
        assert_eq!(EngineError::NoInfo.http_status(), 404);
        assert_eq!(EngineError::Timeout.http_status(), 408);
        assert_eq!(EngineError::ShuttingDown.http_status(), 503);
    }

    #[test]
    fn messages_match_job_errors() {
        assert_eq!(EngineError::NotFound.to_string(), "Video not found");
        assert_eq!(EngineError::NotFound.job_error_kind(), JobErrorKind::NotFound);
        assert_eq!(
            EngineError::LookupFailed("boom".into()).to_string(),
            "Failed to get video information: boom"
        );
    }
}
