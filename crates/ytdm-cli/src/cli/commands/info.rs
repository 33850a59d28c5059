//! `ytdm info` – show video metadata.

use anyhow::Result;
use ytdm_core::Engine;

pub async fn run_info(engine: &Engine, url: &str, json: bool) -> Result<()> {
    let info = engine.video_info(url).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Title:    {}", info.title);
    if let Some(channel) = &info.channel {
        println!("Channel:  {channel}");
    }
    if let Some(secs) = info.duration {
        let secs = secs.round() as u64;
        println!("Duration: {}:{:02}", secs / 60, secs % 60);
    }
    if let Some(date) = &info.upload_date {
        println!("Uploaded: {date}");
    }
    if let Some(views) = info.view_count {
        println!("Views:    {views}");
    }
    if !info.available_formats.is_empty() {
        println!("Formats:  {}", info.available_formats.len());
        println!("  {:<10} {:<6} {:<12} {}", "ID", "EXT", "QUALITY", "SIZE");
        for f in &info.available_formats {
            println!(
                "  {:<10} {:<6} {:<12} {}",
                f.format_id.as_deref().unwrap_or("-"),
                f.ext.as_deref().unwrap_or("-"),
                f.quality.as_deref().unwrap_or("-"),
                f.filesize
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }
    Ok(())
}
