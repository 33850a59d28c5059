//! `ytdm formats` – list supported formats and qualities.

use ytdm_core::request::{Format, Quality};

pub fn run_formats() {
    let join = |items: &[String]| items.join(", ");
    let video: Vec<String> = Format::VIDEO.iter().map(|f| f.to_string()).collect();
    let audio: Vec<String> = Format::AUDIO.iter().map(|f| f.to_string()).collect();
    let qualities: Vec<String> = Quality::ALL.iter().map(|q| q.to_string()).collect();
    println!("Video formats: {}", join(&video));
    println!("Audio formats: {}", join(&audio));
    println!("Qualities:     {}", join(&qualities));
}
