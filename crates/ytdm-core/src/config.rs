use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Admission limits and launch pacing (`[admission]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of jobs in `downloading` at once.
    pub max_concurrent: usize,
    /// Delay a queued job waits before it competes for a slot.
    #[serde(with = "humantime_serde")]
    pub queue_delay: Duration,
    /// Base spacing between external download launches, before escalation.
    #[serde(with = "humantime_serde")]
    pub base_cooldown: Duration,
    /// Relative jitter applied to each cool-down (0.25 = +/-25%).
    pub cooldown_jitter: f64,
    /// Fixed spacing between metadata lookups.
    #[serde(with = "humantime_serde")]
    pub lookup_spacing: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            queue_delay: Duration::from_secs(5),
            base_cooldown: Duration::from_secs(8),
            cooldown_jitter: 0.25,
            lookup_spacing: Duration::from_secs(8),
        }
    }
}

/// Process timeouts (`[timeouts]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard timeout for the main download attempt.
    #[serde(with = "humantime_serde")]
    pub download_hard: Duration,
    /// Watchdog that kills a download still registered after this long.
    #[serde(with = "humantime_serde")]
    pub download_watchdog: Duration,
    /// Hard timeout for a metadata lookup.
    #[serde(with = "humantime_serde")]
    pub lookup_hard: Duration,
    /// Watchdog for metadata lookups.
    #[serde(with = "humantime_serde")]
    pub lookup_watchdog: Duration,
    /// Grace window between SIGTERM and SIGKILL.
    #[serde(with = "humantime_serde")]
    pub kill_grace: Duration,
    /// Grace window used when a lookup is torn down.
    #[serde(with = "humantime_serde")]
    pub lookup_kill_grace: Duration,
    /// Extra wait before the fallback attempt.
    #[serde(with = "humantime_serde")]
    pub fallback_delay: Duration,
    /// Hard timeout for the fallback attempt.
    #[serde(with = "humantime_serde")]
    pub fallback_hard: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            download_hard: Duration::from_secs(5 * 60),
            download_watchdog: Duration::from_secs(10 * 60),
            lookup_hard: Duration::from_secs(90),
            lookup_watchdog: Duration::from_secs(120),
            kill_grace: Duration::from_secs(5),
            lookup_kill_grace: Duration::from_secs(2),
            fallback_delay: Duration::from_secs(15),
            fallback_hard: Duration::from_secs(5 * 60),
        }
    }
}

/// Job history retention (`[retention]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum number of jobs kept once finished jobs can be evicted.
    pub max_jobs: usize,
    /// How often the retention sweep runs.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_jobs: 10,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Global configuration loaded from `~/.config/ytdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YtdmConfig {
    /// Argv prefix used to invoke the external downloader.
    pub downloader: Vec<String>,
    /// Default output directory; None = the user's download directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    pub admission: AdmissionConfig,
    pub timeouts: TimeoutConfig,
    pub retention: RetentionConfig,
}

impl Default for YtdmConfig {
    fn default() -> Self {
        Self {
            downloader: vec!["python".into(), "-m".into(), "yt_dlp".into()],
            download_dir: None,
            admission: AdmissionConfig::default(),
            timeouts: TimeoutConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl YtdmConfig {
    /// Program and leading arguments of the downloader command.
    pub fn downloader_command(&self) -> (&str, &[String]) {
        match self.downloader.split_first() {
            Some((program, rest)) => (program.as_str(), rest),
            None => ("yt-dlp", &[]),
        }
    }

    /// Apply `YTDM_DOWNLOADER` / `YTDM_DOWNLOAD_DIR` overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("YTDM_DOWNLOADER").ok().as_deref(),
            std::env::var_os("YTDM_DOWNLOAD_DIR").map(PathBuf::from),
        );
    }

    fn apply_overrides(&mut self, downloader: Option<&str>, download_dir: Option<PathBuf>) {
        if let Some(cmd) = downloader {
            let argv: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
            if !argv.is_empty() {
                self.downloader = argv;
            }
        }
        if let Some(dir) = download_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.download_dir = Some(dir);
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overrides are applied on top.
pub fn load_or_init() -> Result<YtdmConfig> {
    let mut cfg = load_or_init_at(&config_path()?)?;
    cfg.apply_env_overrides();
    Ok(cfg)
}

/// Like [`load_or_init`] for an explicit path, without env overrides.
pub fn load_or_init_at(path: &Path) -> Result<YtdmConfig> {
    if !path.exists() {
        let default_cfg = YtdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: YtdmConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
