use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use worker::*;

use crate::error::{ErrorKind, ResolveError};
use crate::media::types::MediaItem;
use crate::pipeline::Resolved;
use crate::state::AppState;

/// Maximum number of links accepted by the batch route.
pub const MAX_BATCH_URLS: usize = 5;

const ANONYMOUS_SESSION: &str = "anonymous";

const SUGGESTIONS: [&str; 4] = [
    "Check if the URL is correct and accessible",
    "Try again in a few minutes",
    "Ensure the content is public",
    "Contact support if issue persists",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest {
    url: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    #[serde(default)]
    urls: Vec<String>,
    session_id: Option<String>,
}

/// JSON shape of one resolution outcome.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResolutionBody {
    #[serde(rename_all = "camelCase")]
    Success {
        success: bool,
        media: Arc<Vec<MediaItem>>,
        count: usize,
        original_url: String,
        cached: bool,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        success: bool,
        url: String,
        error_kind: ErrorKind,
        error: String,
        suggestions: &'static [&'static str],
    },
}

impl ResolutionBody {
    pub fn new(input: &str, result: std::result::Result<Resolved, ResolveError>, timestamp: u64) -> Self {
        match result {
            Ok(resolved) => ResolutionBody::Success {
                success: true,
                count: resolved.count(),
                media: resolved.media,
                original_url: resolved.canonical_url,
                cached: resolved.cached,
                timestamp,
            },
            Err(err) => ResolutionBody::failure(input, err.kind(), err.to_string()),
        }
    }

    fn failure(input: &str, kind: ErrorKind, message: String) -> Self {
        ResolutionBody::Failure {
            success: false,
            url: input.to_string(),
            error_kind: kind,
            error: message,
            suggestions: &SUGGESTIONS,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionBody::Success { .. })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ResolutionBody::Success { .. } => 200,
            ResolutionBody::Failure { error_kind, .. } => error_kind.status_code(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    total: usize,
    successful: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct BatchBody {
    success: bool,
    results: Vec<ResolutionBody>,
    summary: BatchSummary,
}

fn session_or_anonymous(session_id: Option<String>) -> String {
    session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| ANONYMOUS_SESSION.to_string())
}

/// Rejects a missing or blank `url` with the `InvalidUrl` failure body.
fn required_url(url: Option<String>) -> std::result::Result<String, ResolutionBody> {
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ResolutionBody::failure("", ErrorKind::InvalidUrl, "URL is required".to_string()))
}

fn check_batch_size(urls: &[String]) -> std::result::Result<(), &'static str> {
    match urls.len() {
        0 => Err("URLs array is required"),
        n if n > MAX_BATCH_URLS => Err("Maximum 5 URLs allowed per batch"),
        _ => Ok(()),
    }
}

fn json_error(status: u16, message: &str) -> Result<Response> {
    let body = serde_json::json!({ "success": false, "error": message });
    Ok(Response::from_json(&body)?.with_status(status))
}

/// Resolves one link.
///
/// Route: `POST /api/download` with `{"url": "...", "sessionId": "..."}`
pub async fn single(mut req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let payload: DownloadRequest = match req.json().await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "[download] unreadable request body");
            return json_error(400, "Request body must be JSON");
        }
    };

    let url = match required_url(payload.url) {
        Ok(url) => url,
        Err(body) => return Ok(Response::from_json(&body)?.with_status(body.status_code())),
    };
    let session_id = session_or_anonymous(payload.session_id);

    let state = &ctx.data;
    let result = state.resolver.resolve(&url, &session_id).await;
    if let Err(err) = &result {
        warn!(kind = ?err.kind(), session = %session_id, "[download] resolution failed");
    }

    let body = ResolutionBody::new(&url, result, state.now_ms());
    let status = body.status_code();
    Ok(Response::from_json(&body)?.with_status(status))
}

/// Resolves up to [`MAX_BATCH_URLS`] links one after another.
///
/// Route: `POST /api/download/batch` with `{"urls": [...], "sessionId": "..."}`
pub async fn batch(mut req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let payload: BatchRequest = match req.json().await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "[batch] unreadable request body");
            return json_error(400, "Request body must be JSON");
        }
    };

    if let Err(message) = check_batch_size(&payload.urls) {
        return json_error(400, message);
    }

    let session_id = session_or_anonymous(payload.session_id);
    let state = &ctx.data;

    let mut results = Vec::with_capacity(payload.urls.len());
    for url in &payload.urls {
        let result = state.resolver.resolve(url, &session_id).await;
        results.push(ResolutionBody::new(url, result, state.now_ms()));
    }

    let body = batch_body(results);
    info!(
        total = body.summary.total,
        successful = body.summary.successful,
        "[batch] done"
    );
    Response::from_json(&body)
}

fn batch_body(results: Vec<ResolutionBody>) -> BatchBody {
    let successful = results.iter().filter(|r| r.is_success()).count();
    BatchBody {
        success: true,
        summary: BatchSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        },
        results,
    }
}
