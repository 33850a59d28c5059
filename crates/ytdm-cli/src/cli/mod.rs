//! CLI for the YTDM media download manager.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ytdm_core::config;
use ytdm_core::request::{Format, Quality};
use ytdm_core::Engine;

use commands::{run_formats, run_get, run_info, run_path};

/// Top-level CLI for the YTDM media download manager.
#[derive(Debug, Parser)]
#[command(name = "ytdm")]
#[command(about = "YTDM: paced media downloads driven by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a video (or its audio) and wait until it finishes.
    Get {
        /// YouTube video URL.
        url: String,

        /// Output format: mp4, webm, mkv, avi, mp3, aac, flac, wav or best.
        #[arg(long, short = 'f', default_value = "mp4")]
        format: Format,

        /// Maximum quality: 360p, 480p, 720p, 1080p, 1440p, 2160p, 4k or best.
        #[arg(long, short = 'q')]
        quality: Option<Quality>,

        /// Directory to save into (default: the configured download directory).
        #[arg(long, short = 'o', value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Extract audio only.
        #[arg(long)]
        audio_only: bool,
    },

    /// Show video metadata without downloading.
    Info {
        /// YouTube video URL.
        url: String,

        /// Print the raw metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List supported formats and qualities.
    Formats,

    /// Print the default download directory.
    Path,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Formats = cli.command {
            run_formats();
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let engine = Engine::start(cfg).context("starting download engine")?;

        let result = tokio::select! {
            res = cli.command.dispatch(&engine) => res,
            _ = shutdown_signal() => {
                tracing::warn!("interrupted, shutting down");
                eprintln!("interrupted, stopping downloads...");
                Err(anyhow::anyhow!("interrupted"))
            }
        };
        engine.shutdown().await;
        result
    }

    async fn dispatch(self, engine: &Engine) -> Result<()> {
        match self {
            CliCommand::Get {
                url,
                format,
                quality,
                output_dir,
                audio_only,
            } => run_get(engine, url, format, quality, output_dir, audio_only).await,
            CliCommand::Info { url, json } => run_info(engine, &url, json).await,
            CliCommand::Formats => {
                run_formats();
                Ok(())
            }
            CliCommand::Path => {
                run_path(engine);
                Ok(())
            }
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests;
