use std::sync::Arc;

use serde::Serialize;
use worker::*;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    cache_size: usize,
    request_count: usize,
    uptime_ms: u64,
}

#[derive(Debug, Serialize)]
struct StorageCounts {
    cache: usize,
    requests: usize,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    uptime: u64,
    storage: StorageCounts,
}

/// Route: `/api/stats`
pub fn stats(_req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let state = &ctx.data;
    Response::from_json(&Stats {
        cache_size: state.cache.len(),
        request_count: state.history.len(),
        uptime_ms: state.uptime_ms(),
    })
}

/// Route: `/health`
pub fn health(_req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let state = &ctx.data;
    Response::from_json(&Health {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.uptime_ms(),
        storage: StorageCounts {
            cache: state.cache.len(),
            requests: state.history.len(),
        },
    })
}
