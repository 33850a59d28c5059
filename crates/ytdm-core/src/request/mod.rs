//! Download request modelling.
//!
//! The typed request record the HTTP layer hands to the engine, plus the
//! pieces derived from it before a launch: URL shape checks and cleanup,
//! output filename and extension, and downloader argument lists.

mod args;
mod filename;
mod url;

pub use args::{download_args, fallback_args, lookup_args};
pub use filename::sanitize_title;
pub use url::{clean_url, is_supported_url};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Container or audio codec requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Mp4,
    Webm,
    Mkv,
    Avi,
    Mp3,
    Aac,
    Flac,
    Wav,
    Best,
}

impl Format {
    pub const VIDEO: [Format; 4] = [Format::Mp4, Format::Webm, Format::Mkv, Format::Avi];
    pub const AUDIO: [Format; 4] = [Format::Mp3, Format::Aac, Format::Flac, Format::Wav];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Mp4 => "mp4",
            Format::Webm => "webm",
            Format::Mkv => "mkv",
            Format::Avi => "avi",
            Format::Mp3 => "mp3",
            Format::Aac => "aac",
            Format::Flac => "flac",
            Format::Wav => "wav",
            Format::Best => "best",
        }
    }

    pub fn is_audio(self) -> bool {
        Self::AUDIO.contains(&self)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VIDEO
            .iter()
            .chain(Self::AUDIO.iter())
            .chain(std::iter::once(&Format::Best))
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported format: {s}"))
    }
}

/// Maximum video height requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "4k")]
    K4,
    #[serde(rename = "best")]
    Best,
}

impl Quality {
    pub const ALL: [Quality; 8] = [
        Quality::P360,
        Quality::P480,
        Quality::P720,
        Quality::P1080,
        Quality::P1440,
        Quality::P2160,
        Quality::K4,
        Quality::Best,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::P360 => "360p",
            Quality::P480 => "480p",
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
            Quality::P1440 => "1440p",
            Quality::P2160 => "2160p",
            Quality::K4 => "4k",
            Quality::Best => "best",
        }
    }

    /// Height cap in pixels; None for `best`.
    pub fn max_height(self) -> Option<u32> {
        match self {
            Quality::P360 => Some(360),
            Quality::P480 => Some(480),
            Quality::P720 => Some(720),
            Quality::P1080 => Some(1080),
            Quality::P1440 => Some(1440),
            Quality::P2160 | Quality::K4 => Some(2160),
            Quality::Best => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported quality: {s}"))
    }
}

/// Inbound download request, as deserialized from the caller's JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    pub format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub audio_only: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format: Format) -> Self {
        Self {
            url: url.into(),
            format,
            quality: None,
            output_path: None,
            audio_only: false,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    /// True when the downloader should extract audio instead of muxing video.
    pub fn extracts_audio(&self) -> bool {
        self.audio_only || self.format.is_audio()
    }

    /// Audio codec passed to `--audio-format`. Audio-only requests with a
    /// video container fall back to mp3.
    pub fn audio_format(&self) -> &'static str {
        if self.format.is_audio() {
            self.format.as_str()
        } else {
            Format::Mp3.as_str()
        }
    }

    /// Container passed to `--merge-output-format`.
    pub fn merge_format(&self) -> &'static str {
        match self.format {
            Format::Webm | Format::Mkv | Format::Avi => self.format.as_str(),
            _ => Format::Mp4.as_str(),
        }
    }

    /// Extension of the file the downloader is expected to write.
    pub fn extension(&self) -> &'static str {
        if self.extracts_audio() {
            self.audio_format()
        } else {
            self.merge_format()
        }
    }

    /// Requested output directory, ignoring blank values and the literal
    /// `string` placeholder some API clients send.
    pub fn requested_dir(&self) -> Option<&Path> {
        let path = self.output_path.as_deref()?;
        let text = path.to_string_lossy();
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "string" {
            None
        } else {
            Some(path)
        }
    }

    /// Output directory for this request, or `default_dir` when none was given.
    pub fn output_dir(&self, default_dir: &Path) -> PathBuf {
        self.requested_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_dir.to_path_buf())
    }

    /// `<sanitized title>.<extension>`.
    pub fn output_filename(&self, title: &str) -> String {
        format!("{}.{}", sanitize_title(title), self.extension())
    }
}
