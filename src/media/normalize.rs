use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::form_urlencoded::byte_serialize;

use super::types::{MediaItem, MediaKind, Quality, RawMedia};
use crate::utils::instagram::strip_query_and_fragment;

/// Maximum number of items returned for one resolution.
pub const MAX_MEDIA_PER_REQUEST: usize = 20;

const VIDEO_EXTENSIONS: [&str; 6] = [".mp4", ".mov", ".avi", ".mkv", ".webm", ".3gp"];
const VIDEO_PATH_MARKERS: [&str; 3] = ["/video/", "_video_", "video_"];

/// Quality rules, checked in order against the lower-cased URL. First match wins.
static QUALITY_RULES: LazyLock<Vec<(Regex, Quality)>> = LazyLock::new(|| {
    [
        (r"\d+p", Quality::Hd),
        (r"hd|high|720|1080|1440|2160", Quality::Hd),
        (r"sd|low|480", Quality::Sd),
        (r"thumb|small", Quality::Low),
    ]
    .into_iter()
    .map(|(pattern, quality)| (Regex::new(pattern).expect("valid quality regex"), quality))
    .collect()
});

/// Per-request inputs to normalization.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    /// Milliseconds since the epoch, stamped into ids and filenames.
    pub timestamp_ms: u64,
}

/// Classifies a URL as video or image by extension and path markers.
///
/// This is a string heuristic, not a content-type probe.
pub fn classify_kind(url: &str) -> MediaKind {
    let lower = url.to_lowercase();
    let is_video = VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        || VIDEO_PATH_MARKERS.iter().any(|marker| lower.contains(marker));

    if is_video {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

pub fn detect_quality(url: &str) -> Quality {
    let lower = url.to_lowercase();
    QUALITY_RULES
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, quality)| *quality)
        .unwrap_or(Quality::Standard)
}

/// Proxy-style link served by `/api/download/media`.
pub fn download_url(source_url: &str, filename: &str) -> String {
    format!(
        "/api/download/media?url={}&filename={}",
        byte_serialize(source_url.as_bytes()).collect::<String>(),
        byte_serialize(filename.as_bytes()).collect::<String>(),
    )
}

/// Turns raw fetcher output into the list returned to clients.
///
/// Items without a URL are skipped, duplicates (same URL once the query
/// string and fragment are removed) keep their first occurrence, and the
/// result is capped at [`MAX_MEDIA_PER_REQUEST`].
pub fn normalize(raw_items: &[RawMedia], ctx: RequestContext) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (index, raw) in raw_items.iter().enumerate() {
        if items.len() == MAX_MEDIA_PER_REQUEST {
            break;
        }

        let Some(source_url) = raw.url.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };

        let canonical_url = strip_query_and_fragment(source_url);
        if !seen.insert(canonical_url.to_string()) {
            continue;
        }

        let kind = classify_kind(source_url);
        let filename = format!("spidey_{}_{}.{}", ctx.timestamp_ms, index + 1, kind.extension());

        items.push(MediaItem {
            id: format!("{}-{}", ctx.timestamp_ms, index),
            source_url: source_url.to_string(),
            canonical_url: canonical_url.to_string(),
            kind,
            quality: detect_quality(source_url),
            thumbnail: raw
                .thumbnail
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| source_url.to_string()),
            download_url: download_url(source_url, &filename),
            filename,
            duration: raw.duration,
            dimensions: raw.dimensions,
            size: raw.size,
            timestamp: ctx.timestamp_ms,
        });
    }

    items
}
