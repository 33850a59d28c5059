//! Tracing setup: append to a file under the XDG state dir, or fall back to stderr.
//!
//! Filter directives come from `YTDM_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Used when neither `YTDM_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "info,ytdm=debug,ytdm_core=debug";

const LOG_ENV: &str = "YTDM_LOG";

fn filter_directives(ytdm_log: Option<String>, rust_log: Option<String>) -> String {
    [ytdm_log, rust_log]
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/ytdm/ytdm.log` (or `$XDG_STATE_HOME/ytdm/ytdm.log`).
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytdm")?;
    Ok(xdg_dirs.get_state_home().join("ytdm.log"))
}

/// Install the global subscriber writing to [`log_file_path`].
/// Errors (unwritable state dir, subscriber already set) are returned so the
/// caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    init_logging_at(&path)?;
    Ok(path)
}

/// Install the global subscriber appending to `path`.
pub fn init_logging_at(path: &Path) -> Result<()> {
    let file = open_log_file(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    tracing::info!(
        pid = std::process::id(),
        "ytdm logging initialized at {}",
        path.display()
    );
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Log to stderr only. A subscriber that is already installed is left alone.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ytdm_log_wins_over_rust_log() {
        let d = filter_directives(Some("warn".into()), Some("trace".into()));
        assert_eq!(d, "warn");
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        assert_eq!(filter_directives(Some("  ".into()), None), DEFAULT_FILTER);
        assert_eq!(filter_directives(None, Some("debug".into())), "debug");
        assert_eq!(filter_directives(None, None), DEFAULT_FILTER);
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn log_file_is_created_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("ytdm").join("ytdm.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }
}
