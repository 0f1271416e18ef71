use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_index))
        .route("/health", get(health_check))
}

async fn api_index() -> impl IntoResponse {
    Json(json!({
        "message": "AI Blog Writer API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "generate": "POST /generate",
            "edit": "POST /edit",
            "edit_simple": "POST /edit/simple",
            "edit_history": "GET /edit/history",
            "edit_undo": "POST /edit/undo/{version_id}",
            "clear_history": "DELETE /edit/history",
            "get_post": "GET /post/{id}",
            "delete_post": "DELETE /post/{id}",
            "post_versions": "GET /post/{id}/versions",
            "edit_post": "POST /post/{id}/edit",
            "list_posts": "GET /posts",
            "search_posts": "GET /posts/search",
            "stats": "GET /posts/stats",
            "health": "GET /health"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(error) => {
            tracing::error!("Database health check failed: {}", error);
            false
        }
    };
    let llm_ready = state.llm.any_available();

    Json(json!({
        "status": if database_ok { "healthy" } else { "degraded" },
        "timestamp": Utc::now(),
        "database": database_ok,
        "agents": {
            "research_agent": state.research.is_some(),
            "blog_writer_agent": llm_ready,
            "image_agent": state.images.is_some(),
            "editing_agent": llm_ready
        }
    }))
}
