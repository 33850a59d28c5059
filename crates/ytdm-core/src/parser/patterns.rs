//! Matchers for the downloader's progress lines.

pub(super) const MERGER_MARKER: &str = "[Merger] Merging formats into";
const DESTINATION_PREFIX: &str = "[download] Destination: ";
const ALREADY_DOWNLOADED_SUFFIX: &str = " has already been downloaded";

/// First `<digits>[.<digits>]%` in the line.
pub(super) fn percent(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let mut start = i;
        while start > 0 && (bytes[start - 1].is_ascii_digit() || bytes[start - 1] == b'.') {
            start -= 1;
        }
        // A leading '.' is not part of the number ("..5%").
        while start < i && bytes[start] == b'.' {
            start += 1;
        }
        if start == i {
            continue;
        }
        if let Ok(value) = line[start..i].parse::<f64>() {
            return Some(value);
        }
    }
    None
}

/// `at <number><unit>/s`, e.g. `at  1.20MiB/s` -> `1.20MiB/s`.
pub(super) fn speed(line: &str) -> Option<&str> {
    let mut rest = line;
    while let Some(pos) = rest.find("at") {
        let after = &rest[pos + 2..];
        let value = after.trim_start();
        if value.len() < after.len() {
            let num_len = value
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(value.len());
            let unit_len = value[num_len..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(value.len() - num_len);
            let end = num_len + unit_len;
            if num_len > 0 && unit_len > 0 && value[end..].starts_with("/s") {
                return Some(&value[..end + 2]);
            }
        }
        rest = after;
    }
    None
}

/// `ETA <digits and colons>`.
pub(super) fn eta(line: &str) -> Option<&str> {
    let pos = line.find("ETA")?;
    let after = &line[pos + 3..];
    let value = after.trim_start();
    if value.len() == after.len() {
        return None;
    }
    let len = value
        .find(|c: char| !(c.is_ascii_digit() || c == ':'))
        .unwrap_or(value.len());
    (len > 0).then(|| &value[..len])
}

pub(super) fn destination(line: &str) -> Option<&str> {
    let pos = line.find(DESTINATION_PREFIX)?;
    non_empty(line[pos + DESTINATION_PREFIX.len()..].trim())
}

/// `[download] <path> has already been downloaded`.
pub(super) fn already_downloaded(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("[download] ")?;
    let path = rest.strip_suffix(ALREADY_DOWNLOADED_SUFFIX)?;
    non_empty(path.trim())
}

/// `[Merger] Merging formats into "<path>"`.
pub(super) fn merge_target(line: &str) -> Option<&str> {
    let pos = line.find(MERGER_MARKER)?;
    let rest = line[pos + MERGER_MARKER.len()..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.rfind('"')?;
    non_empty(rest[..end].trim())
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
