//! `ytdm path` – print the default download directory.

use ytdm_core::Engine;

pub fn run_path(engine: &Engine) {
    println!("{}", engine.default_download_dir().display());
}
