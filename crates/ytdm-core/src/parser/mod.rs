//! Downloader output parser.
//!
//! Pure line -> updates translation, fed one line at a time by the job task.
//! The parser also carries the per-attempt state the engine needs when the
//! process closes: merge state, the last reported output path, and the
//! accumulated error diagnostics.

mod failure;
mod patterns;

pub use failure::{classify_diagnostics, Failure, FailureKind};

use std::path::PathBuf;

/// Keep at most this many bytes of diagnostics (the tail).
const MAX_DIAGNOSTICS: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum OutputUpdate {
    Progress(f64),
    /// Formats are being merged; progress pinned at 99.
    MergeHold,
    Speed(String),
    Eta(String),
    /// The downloader reported where the output file will be.
    Destination(PathBuf),
    /// An error line on stderr.
    Diagnostic { suspected_block: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    /// Percentages only.
    Coarse,
}

#[derive(Debug)]
pub struct ProgressParser {
    mode: Mode,
    merging: bool,
    merge_complete: bool,
    download_complete: bool,
    has_error: bool,
    diagnostics: String,
    output_path: Option<PathBuf>,
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::with_mode(Mode::Full)
    }

    /// Parser for the fallback attempt: tracks percentages only.
    pub fn coarse() -> Self {
        Self::with_mode(Mode::Coarse)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            merging: false,
            merge_complete: false,
            download_complete: false,
            has_error: false,
            diagnostics: String::new(),
            output_path: None,
        }
    }

    pub fn on_stdout(&mut self, line: &str) -> Vec<OutputUpdate> {
        let mut updates = Vec::new();

        if self.mode == Mode::Coarse {
            if let Some(p) = patterns::percent(line) {
                updates.push(OutputUpdate::Progress(p));
            }
            return updates;
        }

        if let Some(target) = patterns::merge_target(line) {
            self.merging = true;
            self.output_path = Some(PathBuf::from(target));
            updates.push(OutputUpdate::MergeHold);
            updates.push(OutputUpdate::Destination(PathBuf::from(target)));
        } else if line.contains(patterns::MERGER_MARKER) {
            self.merging = true;
            updates.push(OutputUpdate::MergeHold);
        }

        if self.merging
            && (line.contains("Deleting original file") || line.contains("100% of"))
        {
            self.merge_complete = true;
        }

        if let Some(p) = patterns::percent(line) {
            if p >= 100.0 {
                self.download_complete = true;
            }
            if self.merge_pending() {
                updates.push(OutputUpdate::Progress(p.min(99.0)));
            } else {
                updates.push(OutputUpdate::Progress(p));
            }
        }
        if let Some(speed) = patterns::speed(line) {
            updates.push(OutputUpdate::Speed(speed.to_string()));
        }
        if let Some(eta) = patterns::eta(line) {
            updates.push(OutputUpdate::Eta(eta.to_string()));
        }

        // The merge target supersedes any per-format destination.
        if !self.merging {
            if let Some(dest) =
                patterns::destination(line).or_else(|| patterns::already_downloaded(line))
            {
                self.output_path = Some(PathBuf::from(dest));
                updates.push(OutputUpdate::Destination(PathBuf::from(dest)));
            }
        }

        updates
    }

    pub fn on_stderr(&mut self, line: &str) -> Vec<OutputUpdate> {
        if !line.to_ascii_lowercase().contains("error") {
            return Vec::new();
        }
        self.has_error = true;
        self.push_diagnostic(line);
        let suspected_block =
            line.contains("403") || line.contains("Forbidden") || line.contains("blocked");
        vec![OutputUpdate::Diagnostic { suspected_block }]
    }

    fn push_diagnostic(&mut self, line: &str) {
        push_tail(&mut self.diagnostics, line, MAX_DIAGNOSTICS);
    }

    pub fn is_merging(&self) -> bool {
        self.merging
    }

    pub fn merge_complete(&self) -> bool {
        self.merge_complete
    }

    /// Merge entered but not yet confirmed.
    pub fn merge_pending(&self) -> bool {
        self.merging && !self.merge_complete
    }

    /// A 100% line was seen.
    pub fn download_complete(&self) -> bool {
        self.download_complete
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }
}

/// Appends `line` to `buf` as a new line, then drops whole characters from
/// the front so at most `max` bytes remain.
pub(crate) fn push_tail(buf: &mut String, line: &str, max: usize) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(line.trim_end());
    if buf.len() > max {
        let mut cut = buf.len() - max;
        while !buf.is_char_boundary(cut) {
            cut += 1;
        }
        buf.drain(..cut);
    }
}
