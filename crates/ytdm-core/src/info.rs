//! Video metadata as returned by a `--dump-json` lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// Largest lookup output accepted.
pub const MAX_INFO_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub quality: Option<String>,
    pub filesize: Option<u64>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub channel: Option<String>,
    pub description: Option<String>,
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub available_formats: Vec<FormatInfo>,
}

/// Raw shape of the tool's JSON; only the fields we surface.
#[derive(Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    description: Option<String>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    ext: Option<String>,
    format_note: Option<String>,
    quality: Option<Value>,
    filesize: Option<u64>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

impl From<RawFormat> for FormatInfo {
    fn from(f: RawFormat) -> Self {
        let quality = f.format_note.or_else(|| match f.quality {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        FormatInfo {
            format_id: f.format_id,
            ext: f.ext,
            quality,
            filesize: f.filesize,
            fps: f.fps,
            vcodec: f.vcodec,
            acodec: f.acodec,
        }
    }
}

/// Parses lookup output. Empty output is `NoInfo`; malformed JSON or a
/// missing title is `InvalidInfo`.
pub fn parse_video_info(output: &str) -> Result<VideoInfo, EngineError> {
    let output = output.trim();
    if output.is_empty() {
        return Err(EngineError::NoInfo);
    }
    let raw: RawInfo = serde_json::from_str(output)
        .map_err(|e| EngineError::InvalidInfo(format!("failed to parse video information: {e}")))?;
    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| EngineError::InvalidInfo("missing title".to_string()))?;

    Ok(VideoInfo {
        title,
        duration: raw.duration,
        thumbnail: raw.thumbnail,
        channel: raw.channel.or(raw.uploader),
        description: raw.description,
        upload_date: raw.upload_date,
        view_count: raw.view_count,
        available_formats: raw.formats.into_iter().map(FormatInfo::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "title": "Never Gonna Give You Up",
        "duration": 212,
        "thumbnail": "https://i.ytimg.com/vi/x/maxresdefault.jpg",
        "uploader": "Rick Astley",
        "upload_date": "20091025",
        "view_count": 1500000000,
        "formats": [
            {"format_id": "140", "ext": "m4a", "format_note": "medium", "filesize": 3400000, "acodec": "mp4a.40.2", "vcodec": "none"},
            {"format_id": "137", "ext": "mp4", "quality": 8, "fps": 25, "vcodec": "avc1", "acodec": "none"}
        ]
    }"#;

    #[test]
    fn parses_sample() {
        let info = parse_video_info(SAMPLE).unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.duration, Some(212.0));
        assert_eq!(info.channel.as_deref(), Some("Rick Astley"));
        assert_eq!(info.available_formats.len(), 2);
        assert_eq!(info.available_formats[0].quality.as_deref(), Some("medium"));
        assert_eq!(info.available_formats[1].quality.as_deref(), Some("8"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["uploadDate"], "20091025");
        assert_eq!(json["availableFormats"][0]["formatId"], "140");
    }

    #[test]
    fn channel_preferred_over_uploader() {
        let info = parse_video_info(r#"{"title":"t","channel":"C","uploader":"U"}"#).unwrap();
        assert_eq!(info.channel.as_deref(), Some("C"));
        assert!(info.available_formats.is_empty());
    }

    #[test]
    fn error_cases() {
        assert!(matches!(parse_video_info("  \n"), Err(EngineError::NoInfo)));
        assert!(matches!(parse_video_info("{not json"), Err(EngineError::InvalidInfo(_))));
        assert!(matches!(parse_video_info(r#"{"duration": 3}"#), Err(EngineError::InvalidInfo(_))));
    }
}
