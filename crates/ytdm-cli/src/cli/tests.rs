use super::*;
use ytdm_core::registry::{Job, JobId, JobStatus};

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_get_defaults() {
    match parse(&["ytdm", "get", "https://youtu.be/abc"]) {
        CliCommand::Get {
            url,
            format,
            quality,
            output_dir,
            audio_only,
        } => {
            assert_eq!(url, "https://youtu.be/abc");
            assert_eq!(format, Format::Mp4);
            assert!(quality.is_none());
            assert!(output_dir.is_none());
            assert!(!audio_only);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_all_options() {
    match parse(&[
        "ytdm",
        "get",
        "https://youtu.be/abc",
        "--format",
        "MKV",
        "-q",
        "4k",
        "-o",
        "/tmp/dl",
        "--audio-only",
    ]) {
        CliCommand::Get {
            format,
            quality,
            output_dir,
            audio_only,
            ..
        } => {
            assert_eq!(format, Format::Mkv);
            assert_eq!(quality, Some(Quality::K4));
            assert_eq!(output_dir, Some(PathBuf::from("/tmp/dl")));
            assert!(audio_only);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_rejects_unknown_format_and_quality() {
    assert!(Cli::try_parse_from(["ytdm", "get", "u", "--format", "gif"]).is_err());
    assert!(Cli::try_parse_from(["ytdm", "get", "u", "--quality", "999p"]).is_err());
    assert!(Cli::try_parse_from(["ytdm", "get"]).is_err());
}

#[test]
fn cli_parse_info() {
    match parse(&["ytdm", "info", "https://youtu.be/abc", "--json"]) {
        CliCommand::Info { url, json } => {
            assert_eq!(url, "https://youtu.be/abc");
            assert!(json);
        }
        _ => panic!("expected Info"),
    }
}

#[test]
fn cli_parse_formats_and_path() {
    assert!(matches!(parse(&["ytdm", "formats"]), CliCommand::Formats));
    assert!(matches!(parse(&["ytdm", "path"]), CliCommand::Path));
}

#[test]
fn progress_line_shows_known_fields() {
    let mut job = Job::new(JobId::from("dl_1"), "https://youtu.be/abc", JobStatus::Downloading);
    job.progress = 45.2;
    job.speed = Some("1.2MiB/s".into());
    job.eta = Some("00:30".into());
    let line = commands::progress_line(&job);
    assert!(line.contains("downloading"));
    assert!(line.contains("45.2%"));
    assert!(line.contains("1.2MiB/s"));
    assert!(line.contains("ETA 00:30"));
}
