//! URL shape validation and cleanup.

use url::Url;

/// Query parameters that turn a single video into a playlist or radio mix.
const STRIPPED_PARAMS: [&str; 3] = ["list", "start_radio", "pp"];

/// Returns true for `[http[s]://][www.]youtube.com/<path>` and
/// `[http[s]://][www.]youtu.be/<path>` with a non-empty, single-line path.
pub fn is_supported_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let Some(path) = rest
        .strip_prefix("youtube.com/")
        .or_else(|| rest.strip_prefix("youtu.be/"))
    else {
        return false;
    };
    !path.is_empty() && !path.contains(['\n', '\r', '\u{2028}', '\u{2029}'])
}

/// Removes playlist/radio parameters. Returns the input unchanged when it
/// cannot be parsed as an absolute URL.
pub fn clean_url(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!("failed to clean URL, using original: {}", e);
            return url.to_string();
        }
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !STRIPPED_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    let cleaned = parsed.to_string();
    if cleaned != url {
        tracing::info!("URL cleaned from {} to {}", url, cleaned);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_youtube_shapes() {
        assert!(is_supported_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_supported_url("http://youtube.com/watch?v=abc"));
        assert!(is_supported_url("youtube.com/shorts/xyz"));
        assert!(is_supported_url("https://youtu.be/abc"));
        assert!(is_supported_url("www.youtu.be/abc"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(!is_supported_url(""));
        assert!(!is_supported_url("https://www.youtube.com/"));
        assert!(!is_supported_url("https://m.youtube.com/watch?v=abc"));
        assert!(!is_supported_url("https://vimeo.com/123"));
        assert!(!is_supported_url("ftp://youtube.com/watch?v=abc"));
        assert!(!is_supported_url("https://youtube.com/watch?v=a\nb"));
        assert!(!is_supported_url("https://youtube.community/x"));
    }

    #[test]
    fn strips_playlist_params() {
        assert_eq!(
            clean_url("https://www.youtube.com/watch?v=abc&list=PL1&start_radio=1&pp=xyz"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            clean_url("https://www.youtube.com/watch?list=PL1"),
            "https://www.youtube.com/watch"
        );
    }

    #[test]
    fn keeps_other_params_and_plain_urls() {
        assert_eq!(
            clean_url("https://www.youtube.com/watch?v=abc&t=42"),
            "https://www.youtube.com/watch?v=abc&t=42"
        );
        assert_eq!(clean_url("https://youtu.be/abc"), "https://youtu.be/abc");
    }

    #[test]
    fn unparseable_url_is_returned_as_is() {
        assert_eq!(
            clean_url("youtube.com/watch?v=abc&list=PL1"),
            "youtube.com/watch?v=abc&list=PL1"
        );
    }
}
