//! Downloader argument lists for the main attempt, the fallback, and lookups.

use std::ffi::OsString;
use std::path::Path;

use super::DownloadRequest;

fn format_selector(request: &DownloadRequest) -> String {
    match request.quality.and_then(|q| q.max_height()) {
        Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
        None => "bestvideo+bestaudio/best".to_string(),
    }
}

/// Arguments for the main download attempt, writing to `output_file`.
pub fn download_args(request: &DownloadRequest, output_file: &Path, url: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--no-playlist".into(),
        "--output".into(),
        output_file.as_os_str().to_owned(),
    ];

    if request.extracts_audio() {
        args.push("--extract-audio".into());
        args.push("--audio-format".into());
        args.push(request.audio_format().into());
    } else {
        args.push("--format".into());
        args.push(format_selector(request).into());
        args.push("--merge-output-format".into());
        args.push(request.merge_format().into());
    }

    args.push("--progress".into());
    args.push("--newline".into());
    args.push("--no-warnings".into());
    args.push(url.into());
    args
}

/// Minimal arguments for the fallback attempt: no tuning flags, the most
/// generic format, straight to `expected_path`.
pub fn fallback_args(request: &DownloadRequest, expected_path: &Path, url: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if request.extracts_audio() {
        args.push("--extract-audio".into());
        args.push("--audio-format".into());
        args.push(request.audio_format().into());
    } else {
        args.push("--format".into());
        args.push("best".into());
    }
    args.push("--output".into());
    args.push(expected_path.as_os_str().to_owned());
    args.push(url.into());
    args
}

/// Arguments for a JSON metadata lookup.
pub fn lookup_args(url: &str) -> Vec<OsString> {
    [
        "--dump-json",
        "--no-playlist",
        "--no-check-certificate",
        "--socket-timeout",
        "30",
        "--retries",
        "3",
        url,
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Format, Quality};

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn video_args_with_quality_cap() {
        let req = DownloadRequest::new("https://youtu.be/abc", Format::Mkv).with_quality(Quality::K4);
        let args = strings(&download_args(&req, Path::new("/dl/Title.mkv"), "https://youtu.be/abc"));
        assert_eq!(
            args,
            vec![
                "--no-playlist",
                "--output",
                "/dl/Title.mkv",
                "--format",
                "bestvideo[height<=2160]+bestaudio/best[height<=2160]",
                "--merge-output-format",
                "mkv",
                "--progress",
                "--newline",
                "--no-warnings",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn best_format_merges_to_mp4() {
        let req = DownloadRequest::new("https://youtu.be/abc", Format::Best);
        let args = strings(&download_args(&req, Path::new("/dl/T.mp4"), "u"));
        assert!(args.contains(&"bestvideo+bestaudio/best".to_string()));
        let pos = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[pos + 1], "mp4");
    }

    #[test]
    fn audio_args_extract() {
        let req = DownloadRequest::new("https://youtu.be/abc", Format::Aac);
        let args = strings(&download_args(&req, Path::new("/dl/T.aac"), "u"));
        assert!(args.windows(3).any(|w| w == ["--extract-audio", "--audio-format", "aac"]));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn fallback_args_are_minimal() {
        let req = DownloadRequest::new("https://youtu.be/abc", Format::Mp4).with_quality(Quality::P720);
        let args = strings(&fallback_args(&req, Path::new("/dl/T.mp4"), "u"));
        assert_eq!(args, vec!["--format", "best", "--output", "/dl/T.mp4", "u"]);

        let audio = DownloadRequest::new("https://youtu.be/abc", Format::Mp3);
        let args = strings(&fallback_args(&audio, Path::new("/dl/T.mp3"), "u"));
        assert_eq!(
            args,
            vec!["--extract-audio", "--audio-format", "mp3", "--output", "/dl/T.mp3", "u"]
        );
    }

    #[test]
    fn lookup_args_end_with_url() {
        let args = strings(&lookup_args("https://youtu.be/abc"));
        assert_eq!(args.first().map(String::as_str), Some("--dump-json"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }
}
