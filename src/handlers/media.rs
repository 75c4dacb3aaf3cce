use std::sync::Arc;

use tracing::info;
use url::Url;
use worker::*;

use crate::media::normalize::classify_kind;
use crate::media::types::MediaKind;
use crate::state::AppState;

/// Extracts a single query parameter value from a URL.
fn get_query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Parses the target media URL, accepting only http(s).
fn parse_media_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Keeps a client-supplied filename safe to put inside a quoted header value.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn suggested_filename(given: Option<&str>, kind: MediaKind, now_ms: u64) -> String {
    given
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("spidey_download_{}.{}", now_ms, kind.extension()))
}

/// Download redirect handler.
///
/// Route: `/api/download/media?url=...&filename=...`
/// Redirects to the media URL with an attachment disposition so browsers
/// save the file under the suggested name.
pub fn download(req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let req_url = req.url()?;

    let Some(raw_target) = get_query_param(&req_url, "url") else {
        return Response::error("Media URL is required", 400);
    };
    let Some(target) = parse_media_url(&raw_target) else {
        return Response::error("Media URL must be an http(s) URL", 400);
    };

    let kind = classify_kind(target.as_str());
    let filename = suggested_filename(
        get_query_param(&req_url, "filename").as_deref(),
        kind,
        ctx.data.now_ms(),
    );
    info!(filename = %filename, kind = ?kind, "[media] redirecting download");

    let headers = Headers::new();
    headers.set("Location", target.as_str())?;
    headers.set(
        "Content-Disposition",
        &format!("attachment; filename=\"{filename}\""),
    )?;
    headers.set("Content-Type", kind.content_type())?;

    Ok(Response::empty()?.with_status(302).with_headers(headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_decoded_query_params() {
        let url = Url::parse(
            "https://spidey.dev/api/download/media?url=https%3A%2F%2Fcdn%2Fx.mp4%3Fa%3D1&filename=",
        )
        .unwrap();
        assert_eq!(get_query_param(&url, "url").as_deref(), Some("https://cdn/x.mp4?a=1"));
        assert_eq!(get_query_param(&url, "filename"), None);
    }

    #[test]
    fn only_http_targets_are_redirected() {
        assert!(parse_media_url("https://cdn/x.jpg").is_some());
        assert!(parse_media_url("javascript:alert(1)").is_none());
        assert!(parse_media_url("/relative").is_none());
    }

    #[test]
    fn filename_is_sanitized() {
        assert_eq!(sanitize_filename("a\"b/c\\d\n.jpg"), "abcd.jpg");
    }

    #[test]
    fn filename_defaults_by_kind() {
        assert_eq!(suggested_filename(None, MediaKind::Video, 5), "spidey_download_5.mp4");
        assert_eq!(suggested_filename(Some("\"\""), MediaKind::Image, 5), "spidey_download_5.jpg");
        assert_eq!(suggested_filename(Some("mine.jpg"), MediaKind::Image, 5), "mine.jpg");
    }
}
