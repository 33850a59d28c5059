//! `ytdm get` – submit a download and follow it to completion.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;
use ytdm_core::registry::{Job, JobStatus};
use ytdm_core::request::{DownloadRequest, Format, Quality};
use ytdm_core::Engine;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_get(
    engine: &Engine,
    url: String,
    format: Format,
    quality: Option<Quality>,
    output_dir: Option<PathBuf>,
    audio_only: bool,
) -> Result<()> {
    let mut request = DownloadRequest::new(url, format).with_audio_only(audio_only);
    if let Some(q) = quality {
        request = request.with_quality(q);
    }
    if let Some(dir) = output_dir {
        request = request.with_output_path(dir);
    }

    let id = engine.submit(request)?;
    println!("Started download {id}");

    let mut last_line = String::new();
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        let Some(job) = engine.status(&id) else {
            bail!("download {id} is no longer tracked");
        };
        let line = progress_line(&job);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        match job.status {
            JobStatus::Completed => {
                if let Some(path) = job.file_path {
                    println!("Saved to {}", path.display());
                }
                return Ok(());
            }
            JobStatus::Error => {
                bail!(
                    "{}",
                    job.error.unwrap_or_else(|| "download failed".to_string())
                );
            }
            JobStatus::Queued | JobStatus::Downloading => {}
        }
    }
}

pub(crate) fn progress_line(job: &Job) -> String {
    let mut line = format!("[{:<11}] {:>5.1}%", job.status.as_str(), job.progress);
    if let Some(speed) = &job.speed {
        line.push_str(&format!("  {speed}"));
    }
    if let Some(eta) = &job.eta {
        line.push_str(&format!("  ETA {eta}"));
    }
    if let Some(name) = &job.filename {
        line.push_str(&format!("  {name}"));
    }
    line
}
