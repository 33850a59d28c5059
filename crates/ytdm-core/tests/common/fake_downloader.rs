//! Fake downloader for integration tests.
//!
//! A small POSIX shell script standing in for yt-dlp. The scenario is the
//! last path segment of the URL (e.g. `https://youtu.be/ok`), so each test
//! picks behaviour through the URL it submits. The script understands the
//! flags the engine passes: `--dump-json` for lookups, `--output <path>`,
//! and `--progress` (absent on the fallback attempt).

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use ytdm_core::config::YtdmConfig;
use ytdm_core::registry::{Job, JobId};
use ytdm_core::Engine;

const SCRIPT: &str = r#"#!/bin/sh
out=""
prev=""
last=""
mode="download"
progress=""
for a in "$@"; do
  if [ "$prev" = "--output" ]; then out="$a"; fi
  case "$a" in
    --dump-json) mode="info" ;;
    --progress) progress="1" ;;
  esac
  prev="$a"
  last="$a"
done
scenario="${last##*/}"

if [ "$mode" = "info" ]; then
  case "$scenario" in
    private) echo "ERROR: [youtube] private: Private video. Sign in if you've been granted access" >&2; exit 1 ;;
    gone) echo "ERROR: [youtube] gone: Video unavailable" >&2; exit 1 ;;
    noisy)
      i=0
      while [ "$i" -lt 400 ]; do
        echo "WARNING: [youtube] noisy: retrying fragment $i of 400 after a transient hiccup" >&2
        i=$((i + 1))
      done
      echo "ERROR: [youtube] noisy: Private video. Sign in if you've been granted access" >&2
      exit 1 ;;
    empty) exit 0 ;;
    garbage) echo "not json at all"; exit 0 ;;
  esac
  printf '{"title": "Test Video %s %s", "duration": 3, "uploader": "Tester", "formats": [{"format_id": "18", "ext": "mp4", "format_note": "360p"}]}\n' "$scenario" "$$"
  exit 0
fi

if [ -z "$progress" ]; then
  case "$scenario" in
    blocked) echo "[download]  50.0%"; : > "$out"; echo "[download] 100%"; exit 0 ;;
    *) echo "ERROR: unable to download video data: HTTP Error 403: Forbidden" >&2; exit 255 ;;
  esac
fi

case "$scenario" in
  ok|slow|progress)
    echo "[download] Destination: $out"
    printf '[download]  10.0%% of 10.00MiB at  500.00KiB/s ETA 00:50\r'
    echo "[download]  45.2% of 10.00MiB at  1.2MiB/s ETA 00:30"
    if [ "$scenario" = "slow" ]; then sleep 1; fi
    if [ "$scenario" = "progress" ]; then sleep 2; fi
    : > "$out"
    echo "[download] 100% of 10.00MiB in 00:00:05"
    exit 0 ;;
  merged)
    echo "[download] Destination: ${out%.*}.f137.mp4"
    echo "[download] 100% of 8.00MiB"
    echo "[Merger] Merging formats into \"$out\""
    : > "$out"
    echo "Deleting original file ${out%.*}.f137.mp4 (pass -k to keep)"
    exit 0 ;;
  blocked|blocked_hard)
    echo "[download]   5.0% of 10.00MiB at  1.0MiB/s ETA 00:09"
    echo "ERROR: unable to download video data: HTTP Error 403: Forbidden" >&2
    exit 255 ;;
  nofile)
    echo "[download] 100% of 1.00MiB"
    exit 0 ;;
  broken)
    echo "ERROR: Postprocessing: ffmpeg exited with code 1" >&2
    exit 1 ;;
  hang)
    echo "[download]   1.0% of 10.00MiB at  10.0KiB/s ETA 16:40"
    sleep 30
    exit 0 ;;
esac
echo "ERROR: unknown scenario $scenario" >&2
exit 2
"#;

/// Temp workspace holding the script and the download directory.
pub struct FakeDownloader {
    dir: TempDir,
}

impl FakeDownloader {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("fake-yt-dlp.sh"), SCRIPT).expect("write script");
        std::fs::create_dir(dir.path().join("downloads")).expect("downloads dir");
        Self { dir }
    }

    pub fn script(&self) -> PathBuf {
        self.dir.path().join("fake-yt-dlp.sh")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    /// Config with millisecond-scale pacing and timeouts.
    pub fn config(&self) -> YtdmConfig {
        let mut cfg = YtdmConfig::default();
        cfg.downloader = vec!["sh".into(), self.script().to_string_lossy().into_owned()];
        cfg.download_dir = Some(self.download_dir());
        cfg.admission.queue_delay = Duration::from_millis(50);
        cfg.admission.base_cooldown = Duration::from_millis(10);
        cfg.admission.cooldown_jitter = 0.0;
        cfg.admission.lookup_spacing = Duration::ZERO;
        cfg.timeouts.kill_grace = Duration::from_millis(200);
        cfg.timeouts.lookup_kill_grace = Duration::from_millis(200);
        cfg.timeouts.fallback_delay = Duration::from_millis(50);
        cfg
    }
}

pub fn url(scenario: &str) -> String {
    format!("https://youtu.be/{scenario}")
}

/// Polls until `pred` holds for the job, or panics after `timeout`.
pub async fn wait_for(engine: &Engine, id: &JobId, timeout: Duration, pred: impl Fn(&Job) -> bool) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(job) = engine.status(id) {
            if pred(&job) {
                return job;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for job {id}: {:?}", engine.status(id));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub async fn wait_terminal(engine: &Engine, id: &JobId) -> Job {
    wait_for(engine, id, Duration::from_secs(20), |j| j.status.is_terminal()).await
}

pub fn exists(path: &Path) -> bool {
    path.is_file()
}
