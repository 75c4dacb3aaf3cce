use std::sync::Arc;

use worker::*;

use crate::state::AppState;

/// Route: `/api/history/:sessionId`
pub fn handle(_req: Request, ctx: RouteContext<Arc<AppState>>) -> Result<Response> {
    let Some(session_id) = ctx.param("sessionId") else {
        return Response::error("Bad Request", 400);
    };

    let history = ctx.data.history.for_session(session_id);
    Response::from_json(&serde_json::json!({
        "success": true,
        "count": history.len(),
        "history": history,
    }))
}
