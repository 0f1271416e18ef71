use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use crate::editor::{EditOptions, EditResult};
use crate::models::{
    EditRequest, EditResponse, SimpleEditRequest, SimpleEditResponse, UndoResponse,
    VersionHistoryResponse,
};
use crate::routes::{ApiError, bad_request, llm_error, not_found};
use crate::state::AppState;

pub fn edit_routes() -> Router<AppState> {
    Router::new()
        .route("/edit", post(edit_blog))
        .route("/edit/simple", post(simple_edit))
        .route("/edit/history", get(get_history).delete(clear_history))
        .route("/edit/undo/{version_id}", post(undo_to_version))
}

/// Map a failed edit to a 500 carrying the provider error.
pub(crate) fn failed_edit(result: &EditResult) -> ApiError {
    let message = result
        .error_message
        .as_deref()
        .unwrap_or("unknown error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": format!("Edit failed: {}", message) })),
    )
}

async fn edit_blog(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(bad_request)?;
    let client = state.llm.get(&request.provider).map_err(llm_error)?;

    let result = state
        .editor
        .apply_edit(
            client,
            &request.markdown,
            &request.instruction,
            EditOptions {
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                track_version: request.track_version,
                model: request.model.as_deref(),
            },
        )
        .await;

    if !result.success {
        return Err(failed_edit(&result));
    }

    // Summary and diff are only reported when the caller asks for an export.
    let (changes_summary, diff_text) = if request.export_diff {
        (Some(result.changes_summary), Some(result.diff_text))
    } else {
        (None, None)
    };
    Ok(Json(EditResponse {
        markdown: result.edited_content,
        instruction_applied: result.instruction,
        edited_at: result.timestamp,
        success: true,
        model_used: result.model_used,
        provider_used: result.provider_used,
        changes_summary,
        diff_text,
        error_message: None,
    }))
}

async fn simple_edit(
    State(state): State<AppState>,
    Json(request): Json<SimpleEditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(bad_request)?;
    let client = state.llm.get(&request.provider).map_err(llm_error)?;

    let result = state
        .editor
        .apply_edit(
            client,
            &request.markdown,
            &request.instruction,
            EditOptions {
                track_version: false,
                model: request.model.as_deref(),
                ..EditOptions::default()
            },
        )
        .await;

    if !result.success {
        return Err(failed_edit(&result));
    }

    Ok(Json(SimpleEditResponse {
        markdown: result.edited_content,
        instruction_applied: result.instruction,
        edited_at: result.timestamp,
    }))
}

async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    let versions = state.editor.history();
    let current_version = versions.last().map(|v| v.version_id.clone());
    Json(VersionHistoryResponse {
        versions,
        current_version,
    })
}

async fn undo_to_version(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let markdown = state
        .editor
        .undo_to_version(&version_id)
        .ok_or_else(|| not_found(format!("Version {} not found", version_id)))?;

    Ok(Json(UndoResponse {
        markdown,
        version_restored: version_id,
        restored_at: Utc::now(),
    }))
}

async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    state.editor.clear_history();
    Json(json!({ "message": "Version history cleared" }))
}
