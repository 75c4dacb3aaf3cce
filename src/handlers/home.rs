use std::sync::Arc;

use worker::*;

use crate::state::AppState;
use crate::templates::home_html::render_home;

pub fn handle(_req: Request, _ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    Response::from_html(render_home())
}
