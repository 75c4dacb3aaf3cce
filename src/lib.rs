use std::sync::{Arc, OnceLock};

use tracing::info;
use worker::*;

mod cache;
mod clock;
mod config;
mod error;
mod fetcher;
mod handlers;
mod history;
mod media;
mod pipeline;
mod state;
mod templates;
mod utils;

use crate::clock::WorkerClock;
use crate::config::Config;
use crate::fetcher::graphql::GraphqlFetcher;
use crate::state::AppState;

/// Lives as long as the isolate; rebuilt from env after an eviction.
static APP: OnceLock<Arc<AppState>> = OnceLock::new();

fn app_state(env: &Env) -> Arc<AppState> {
    APP.get_or_init(|| {
        let config = Config::from_env(env);
        utils::log::init(&config.log_level);
        info!(?config, "[init] starting isolate");
        let fetcher = GraphqlFetcher::new(config.graphql_doc_id.clone(), config.fetch_timeout);
        Arc::new(AppState::new(config, Box::new(fetcher), Arc::new(WorkerClock)))
    })
    .clone()
}

#[event(fetch)]
async fn fetch(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    let state = app_state(&env);
    state.sweep_if_due();

    // Strip trailing slash (except root) and redirect-internally by rewriting.
    // Only GETs: the rewritten request carries no body.
    let url = req.url()?;
    let path = url.path().to_string();

    if req.method() == Method::Get && path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let mut new_url = url.clone();
        new_url.set_path(trimmed);
        let mut init = RequestInit::new();
        init.with_method(req.method()).with_headers(req.headers().clone());
        let new_req = Request::new_with_init(new_url.as_str(), &init)?;
        return build_router(state).run(new_req, env).await;
    }

    build_router(state).run(req, env).await
}

#[event(scheduled)]
async fn scheduled(event: ScheduledEvent, env: Env, _ctx: ScheduleContext) {
    console_error_panic_hook::set_once();

    let state = app_state(&env);
    info!(cron = %event.cron(), "[scheduled] sweeping");
    state.sweep();
}

fn build_router(state: Arc<AppState>) -> Router<'static, Arc<AppState>> {
    Router::with_data(state)
        .get("/", handlers::home::handle)
        .post_async("/api/download", handlers::download::single)
        .post_async("/api/download/batch", handlers::download::batch)
        .get("/api/download/media", handlers::media::download)
        .get("/api/history/:sessionId", handlers::history::handle)
        .get("/api/stats", handlers::status::stats)
        .get("/health", handlers::status::health)
}
