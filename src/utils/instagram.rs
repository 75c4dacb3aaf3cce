use std::sync::LazyLock;

use regex::Regex;

static URL_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));

/// Link shapes accepted as Instagram media links, checked after the query
/// string and fragment are removed.
static INSTAGRAM_LINKS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)^https?://(www\.)?instagram\.com/(p|reel|tv|stories)/[A-Za-z0-9_-]+/?",
        r"(?i)^https?://(www\.)?instagr\.am/(p|reel|tv)/[A-Za-z0-9_-]+/?",
        r"(?i)^https?://(www\.)?instagram\.com/stories/[A-Za-z0-9_-]+/\d+/?",
    ]
    .map(|pattern| Regex::new(pattern).expect("valid instagram link regex"))
});

/// Finds the first URL in free-form text and returns the Instagram post, reel,
/// TV or story link at its start, without query, fragment or trailing text.
///
/// The link is returned as matched, so a trailing slash is kept while
/// punctuation stuck to a pasted link is not.
pub fn extract_canonical_url(text: &str) -> Option<String> {
    let found = URL_IN_TEXT.find(text)?.as_str();
    let stripped = cut_at(cut_at(cut_at(found, '?'), '&'), '#');

    match_instagram_link(stripped).map(String::from)
}

/// Returns the longest accepted Instagram link shape at the start of `url`.
pub fn match_instagram_link(url: &str) -> Option<&str> {
    let url = url.trim();
    INSTAGRAM_LINKS
        .iter()
        .filter_map(|re| re.find(url))
        .max_by_key(|m| m.end())
        .map(|m| m.as_str())
}

/// Removes the query string and fragment from a media URL.
pub fn strip_query_and_fragment(url: &str) -> &str {
    cut_at(cut_at(url, '?'), '#')
}

fn cut_at(s: &str, delimiter: char) -> &str {
    s.split(delimiter).next().unwrap_or(s)
}

/// Extracts the post ID (shortcode) from an Instagram URL path.
///
/// Handles paths like `/p/ABC123/`, `/reel/ABC123/`, `/tv/ABC123/`,
/// with or without trailing slashes and extra path segments.
pub fn extract_post_id(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    for (i, segment) in segments.iter().enumerate() {
        if matches!(*segment, "p" | "reel" | "tv" | "reels") {
            return segments.get(i + 1).map(|s| s.to_string());
        }
    }

    None
}

/// Returns `true` for `/stories/...` paths.
pub fn is_story_path(path: &str) -> bool {
    path.split('/')
        .find(|s| !s.is_empty())
        .is_some_and(|first| first.eq_ignore_ascii_case("stories"))
}
