//! Failure classification of accumulated diagnostics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Video unavailable or private.
    Forbidden,
    NotFound,
    /// Network trouble or a timeout reported by the tool.
    Network,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Classifies diagnostics from a non-zero close. `Generic` carries the raw
/// diagnostic text (or `fallback_message` when there is none).
pub fn classify_diagnostics(diagnostics: &str, fallback_message: &str) -> Failure {
    let (kind, message) = if diagnostics.contains("Video unavailable")
        || diagnostics.contains("Private video")
    {
        (FailureKind::Forbidden, "Video is unavailable or private".to_string())
    } else if diagnostics.contains("not found") || diagnostics.contains("No video") {
        (FailureKind::NotFound, "Video not found".to_string())
    } else if diagnostics.contains("network") || diagnostics.contains("timeout") {
        (
            FailureKind::Network,
            "Network error - unable to access video".to_string(),
        )
    } else if diagnostics.trim().is_empty() {
        (FailureKind::Generic, fallback_message.to_string())
    } else {
        (FailureKind::Generic, diagnostics.trim().to_string())
    };
    Failure { kind, message }
}
