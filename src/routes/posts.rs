use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::editor::EditOptions;
use crate::models::{
    BlogPostResponse, PostListResponse, PostQuery, PostSummary, PostVersionListResponse,
    PostVersionSummary, SavedPostEditRequest, SavedPostEditResponse, SearchQuery, SearchResponse,
};
use crate::routes::edit::failed_edit;
use crate::routes::{ApiError, bad_request, db_error, llm_error, not_found};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

pub fn posts_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/search", get(search_posts))
        .route("/posts/stats", get(get_stats))
        .route("/post/{post_id}", get(get_post).delete(delete_post))
        .route("/post/{post_id}/versions", get(get_post_versions))
        .route("/post/{post_id}/edit", post(edit_post))
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

fn post_not_found(post_id: i64) -> ApiError {
    not_found(format!("Post {} not found", post_id))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let posts = state
        .db
        .list_posts(limit, offset)
        .await
        .map_err(db_error)?;
    let total = state.db.count_posts().await.map_err(db_error)?;

    Ok(Json(PostListResponse {
        posts: posts.iter().map(PostSummary::from).collect(),
        total,
        limit,
        offset,
    }))
}

async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let needle = query.query.trim();
    if needle.is_empty() {
        return Err(bad_request("Search query must not be empty"));
    }

    let posts = state
        .db
        .search_posts(needle, clamp_limit(query.limit))
        .await
        .map_err(db_error)?;
    let results: Vec<PostSummary> = posts.iter().map(PostSummary::from).collect();

    Ok(Json(SearchResponse {
        query: needle.to_string(),
        total: results.len(),
        results,
    }))
}

async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.db.get_stats().await.map_err(db_error)?;
    Ok(Json(stats))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .db
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| post_not_found(post_id))?;

    Ok(Json(BlogPostResponse::from(post)))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_post(post_id)
        .await
        .map_err(db_error)?;
    if !deleted {
        return Err(post_not_found(post_id));
    }

    Ok(Json(json!({ "message": format!("Post {} deleted", post_id) })))
}

async fn get_post_versions(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .db
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| post_not_found(post_id))?;
    let versions = state
        .db
        .get_post_versions(post_id)
        .await
        .map_err(db_error)?;

    let versions: Vec<PostVersionSummary> = versions
        .into_iter()
        .map(|version| PostVersionSummary {
            is_current: post.current_version_id == Some(version.id),
            word_count: version.markdown.split_whitespace().count(),
            id: version.id,
            version_number: version.version_number,
            edit_instruction: version.edit_instruction,
            parent_version_id: version.parent_version_id,
            created_at: version.created_at,
        })
        .collect();

    Ok(Json(PostVersionListResponse {
        post_id,
        total_versions: versions.len(),
        current_version_id: post.current_version_id,
        versions,
    }))
}

/// Apply an instruction to a saved post and persist the result as a new version.
async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(request): Json<SavedPostEditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(bad_request)?;

    let post = state
        .db
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| post_not_found(post_id))?;
    let client = state.llm.get(&request.provider).map_err(llm_error)?;

    let result = state
        .editor
        .apply_edit(
            client,
            &post.markdown,
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

    let version = state
        .db
        .update_post_content(post_id, &result.edited_content, Some(request.instruction.as_str()))
        .await
        .map_err(db_error)?
        .ok_or_else(|| post_not_found(post_id))?;

    Ok(Json(SavedPostEditResponse {
        post_id,
        version_number: version.version_number,
        markdown: result.edited_content,
        instruction_applied: result.instruction,
        edited_at: result.timestamp,
        model_used: result.model_used,
        provider_used: result.provider_used,
        changes_summary: result.changes_summary,
    }))
}
