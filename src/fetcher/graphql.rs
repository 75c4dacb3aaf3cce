use std::time::Duration;

use async_trait::async_trait;
use futures::future::{select, Either};
use futures::pin_mut;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;
use worker::{Delay, Fetch, Headers, Method, Request, RequestInit};

use super::MediaFetcher;
use crate::error::FetchError;
use crate::media::types::{Dimensions, RawMedia};
use crate::utils::instagram::{extract_post_id, is_story_path};

pub const DEFAULT_DOC_ID: &str = "25531498899829322";

const GRAPHQL_URL: &str = "https://www.instagram.com/api/graphql";
const CHROME_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";
const IG_APP_ID: &str = "936619743392459";

/// Fetches post media through Instagram's public web GraphQL endpoint.
pub struct GraphqlFetcher {
    doc_id: String,
    timeout: Duration,
}

impl GraphqlFetcher {
    pub fn new(doc_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            doc_id: doc_id.into(),
            timeout,
        }
    }

    async fn post_query(&self, shortcode: &str) -> Result<(u16, String), FetchError> {
        let variables = format!(
            r#"{{"shortcode":"{}","fetch_comment_count":0,"parent_comment_count":0,"child_comment_count":0,"fetch_like_count":0,"fetch_tagged_user_count":null,"fetch_preview_comment_count":0,"has_threaded_comments":false,"hoisted_comment_id":null,"hoisted_reply_id":null}}"#,
            shortcode
        );
        let body = build_graphql_body(&variables, &self.doc_id);
        let headers = build_graphql_headers().map_err(|e| FetchError::Unknown(e.to_string()))?;

        let mut init = RequestInit::new();
        init.with_method(Method::Post)
            .with_headers(headers)
            .with_body(Some(body.into()));

        let request = Request::new_with_init(GRAPHQL_URL, &init)
            .map_err(|e| FetchError::Unknown(e.to_string()))?;
        let mut resp = Fetch::Request(request)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status_code();
        let text = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait(?Send)]
impl MediaFetcher for GraphqlFetcher {
    async fn fetch(&self, canonical_url: &str) -> Result<Vec<RawMedia>, FetchError> {
        let shortcode = shortcode_for(canonical_url)?;
        info!(shortcode = %shortcode, doc_id = %self.doc_id, "[graphql] querying post");

        let query = self.post_query(&shortcode);
        let deadline = Delay::from(self.timeout);
        pin_mut!(query, deadline);

        let (status, text) = match select(query, deadline).await {
            Either::Left((result, _)) => result?,
            Either::Right(_) => {
                warn!(shortcode = %shortcode, timeout = ?self.timeout, "[graphql] request timed out");
                return Err(FetchError::Timeout);
            }
        };
        debug!(status, len = text.len(), "[graphql] response received");

        let media = parse_graphql_response(status, &text)?;
        info!(shortcode = %shortcode, count = media.len(), "[graphql] parsed media");
        Ok(media)
    }
}

/// Picks the shortcode out of a canonical link. Stories are refused because
/// they are only served to logged-in sessions.
fn shortcode_for(canonical_url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(canonical_url).map_err(|e| FetchError::Unknown(e.to_string()))?;

    if is_story_path(parsed.path()) {
        return Err(FetchError::AccessRestricted(
            "stories require a logged-in session".to_string(),
        ));
    }

    extract_post_id(parsed.path())
        .ok_or_else(|| FetchError::Unknown(format!("no post id in {canonical_url}")))
}

/// Maps an HTTP status and body to media descriptors or a fetch error.
fn parse_graphql_response(status: u16, text: &str) -> Result<Vec<RawMedia>, FetchError> {
    match status {
        200..=299 => {}
        401 | 403 | 404 => {
            return Err(FetchError::AccessRestricted(format!("instagram returned {status}")))
        }
        429 => return Err(FetchError::Unknown("rate limited by Instagram".to_string())),
        500..=599 => return Err(FetchError::Network(format!("instagram returned {status}"))),
        _ => return Err(FetchError::Unknown(format!("unexpected status {status}"))),
    }

    if text.contains("require_login") || text.contains("not-logged-in") {
        return Err(FetchError::AccessRestricted("login required".to_string()));
    }

    let json: Value = serde_json::from_str(text)
        .map_err(|e| FetchError::Unknown(format!("unreadable response: {e}")))?;

    let media = json
        .get("data")
        .and_then(|d| d.get("xdt_shortcode_media").or_else(|| d.get("shortcode_media")))
        .filter(|m| !m.is_null())
        // A null media object is what private posts and blocked IPs get.
        .ok_or_else(|| FetchError::AccessRestricted("media unavailable".to_string()))?;

    Ok(raw_media_from_shortcode_media(media))
}

/// Flattens a `shortcode_media` object, including carousels, into raw media.
fn raw_media_from_shortcode_media(media: &Value) -> Vec<RawMedia> {
    if let Some(children) = media
        .get("edge_sidecar_to_children")
        .and_then(|c| c.get("edges"))
        .and_then(|e| e.as_array())
    {
        return children
            .iter()
            .filter_map(|edge| edge.get("node"))
            .map(raw_media_from_node)
            .collect();
    }

    vec![raw_media_from_node(media)]
}

fn raw_media_from_node(node: &Value) -> RawMedia {
    let str_field = |key: &str| node.get(key).and_then(|v| v.as_str()).map(String::from);
    let is_video = node.get("is_video").and_then(|v| v.as_bool()).unwrap_or(false);

    let dimensions = node.get("dimensions").and_then(|d| {
        Some(Dimensions {
            width: u32::try_from(d.get("width")?.as_u64()?).ok()?,
            height: u32::try_from(d.get("height")?.as_u64()?).ok()?,
        })
    });

    if is_video {
        RawMedia {
            url: str_field("video_url"),
            thumbnail: str_field("display_url"),
            duration: node.get("video_duration").and_then(|v| v.as_f64()),
            dimensions,
            size: None,
        }
    } else {
        RawMedia {
            url: str_field("display_url"),
            thumbnail: None,
            duration: None,
            dimensions,
            size: None,
        }
    }
}

/// Builds the form-encoded POST body for the post query.
fn build_graphql_body(variables: &str, doc_id: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs([
            ("av", "0"),
            ("__d", "www"),
            ("__user", "0"),
            ("__a", "1"),
            ("__comet_req", "7"),
            ("lsd", "AVoPBTXMX0Y"),
            ("jazoest", "2882"),
            ("fb_api_caller_class", "RelayModern"),
            ("fb_api_req_friendly_name", "PolarisPostActionLoadPostQueryQuery"),
            ("variables", variables),
            ("server_timestamps", "true"),
            ("doc_id", doc_id),
        ])
        .finish()
}

fn build_graphql_headers() -> worker::Result<Headers> {
    let headers = Headers::new();
    headers.set("Accept", "*/*")?;
    headers.set("Accept-Language", "en-US,en;q=0.9")?;
    headers.set("Content-Type", "application/x-www-form-urlencoded")?;
    headers.set("Origin", "https://www.instagram.com")?;
    headers.set("Referer", "https://www.instagram.com/")?;
    headers.set("Sec-Fetch-Dest", "empty")?;
    headers.set("Sec-Fetch-Mode", "cors")?;
    headers.set("Sec-Fetch-Site", "same-origin")?;
    headers.set("User-Agent", CHROME_UA)?;
    headers.set("X-Asbd-Id", "129477")?;
    headers.set("X-Fb-Lsd", "AVoPBTXMX0Y")?;
    headers.set("X-Fb-Friendly-Name", "PolarisPostActionLoadPostQueryQuery")?;
    headers.set("X-Ig-App-Id", IG_APP_ID)?;
    Ok(headers)
}
