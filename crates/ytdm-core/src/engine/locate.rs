//! Confirms where the downloader actually wrote its output.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters of the sanitized title a directory match must contain.
const TITLE_PREFIX_CHARS: usize = 10;

/// What the job expected the downloader to produce.
#[derive(Debug, Clone)]
pub(super) struct ExpectedOutput {
    pub dir: PathBuf,
    pub path: PathBuf,
    pub stem: String,
    pub extension: &'static str,
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Checks the path the downloader reported, then the expected path, then
/// searches the output directory for a file with the expected extension
/// whose name contains the start of the title.
pub(super) async fn find_output(reported: Option<&Path>, expected: &ExpectedOutput) -> Option<PathBuf> {
    let reported = reported.map(|p| {
        if p.is_relative() {
            expected.dir.join(p)
        } else {
            p.to_path_buf()
        }
    });
    for candidate in reported.iter().chain(std::iter::once(&expected.path)) {
        if is_file(candidate).await {
            debug!(path = %candidate.display(), "output found at expected path");
            return Some(candidate.clone());
        }
    }

    info!(dir = %expected.dir.display(), "output not at expected paths, searching directory");
    let prefix: String = expected.stem.chars().take(TITLE_PREFIX_CHARS).collect();
    let suffix = format!(".{}", expected.extension);

    let mut entries = tokio::fs::read_dir(&expected.dir).await.ok()?;
    let mut matches = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(&suffix) && name.contains(&prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    for candidate in matches {
        if is_file(&candidate).await {
            info!(path = %candidate.display(), "found file with similar name");
            return Some(candidate);
        }
    }
    None
}
