//! Incremental line splitting over raw process output.

/// Longest pending line kept before it is flushed as-is.
pub const MAX_PENDING: usize = 1 << 20;

/// Splits a byte stream on `\n` and `\r`, so carriage-return progress
/// redraws surface as separate lines as soon as they arrive. Empty pieces
/// (e.g. from `\r\n`) are skipped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in chunk {
            if b == b'\n' || b == b'\r' {
                self.flush_into(&mut lines);
            } else {
                self.pending.push(b);
                if self.pending.len() >= MAX_PENDING {
                    self.flush_into(&mut lines);
                }
            }
        }
        lines
    }

    /// Returns the trailing partial line, if any, at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        self.flush_into(&mut lines);
        lines.pop()
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        lines.push(String::from_utf8_lossy(&self.pending).into_owned());
        self.pending.clear();
    }
}
