use std::time::Instant;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use chrono::Utc;
use serde_json::json;

use crate::llm::LlmError;
use crate::models::{GenerateRequest, GenerateResponse, NewBlogPost};
use crate::routes::{ApiError, bad_request, db_error, llm_error};
use crate::state::AppState;
use crate::writer;

pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/generate", post(generate_blog))
}

struct Draft {
    markdown: String,
    provider: String,
    model: String,
    degraded: bool,
}

async fn generate_blog(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(bad_request)?;
    let topic = request.topic.trim();
    let started = Instant::now();
    tracing::info!(topic, provider = %request.provider, "Generating blog");

    let articles = match &state.research {
        Some(research) => research.search(topic, request.research_count as usize).await,
        None => Vec::new(),
    };
    let context = writer::research_context(&articles);

    let draft = write_draft(&state, &request, topic, &context).await?;

    let mut markdown = draft.markdown;
    let mut images = Vec::new();
    if let Some(image_client) = state.images.as_ref().filter(|_| request.include_images) {
        let keywords = writer::extract_image_keywords(&markdown);
        images = image_client
            .fetch_images(topic, &keywords, request.image_count as usize)
            .await;
    }

    if request.embed_images {
        let (embedded, used) = writer::embed_images(&markdown, &images);
        markdown = writer::add_image_credits(&embedded, &used);
        images = used;
    } else {
        // Drop the placeholders; fetched images are still returned.
        markdown = writer::embed_images(&markdown, &[]).0;
    }

    let sources_cited = writer::used_sources(&markdown, &articles).len();
    let word_count = writer::word_count(&markdown);
    let metadata = json!({
        "provider": draft.provider,
        "model": draft.model,
        "research_count": articles.len(),
        "sources_cited": sources_cited,
        "images_count": images.len(),
        "word_count": word_count,
        "degraded": draft.degraded,
        "generation_time_secs": started.elapsed().as_secs_f64(),
        "created_at": Utc::now(),
    });

    let post = state
        .db
        .create_post(&NewBlogPost {
            topic: topic.to_string(),
            markdown,
            sources: articles,
            images,
            provider: draft.provider,
            model: draft.model,
            metadata,
        })
        .await
        .map_err(db_error)?;

    tracing::info!(post_id = post.id, word_count, "Blog generated");
    Ok(Json(GenerateResponse {
        id: post.id.to_string(),
        markdown: post.markdown,
        references: post.sources,
        images: post.images,
        metadata: post.metadata,
    }))
}

/// Generate the post body, falling back to the static template when enabled.
async fn write_draft(
    state: &AppState,
    request: &GenerateRequest,
    topic: &str,
    context: &str,
) -> Result<Draft, ApiError> {
    let fallback_enabled = state.config.generation_fallback;

    let failure = match state.llm.get(&request.provider) {
        Ok(client) => {
            match writer::generate_post(client, topic, context, request.model.as_deref()).await {
                Ok(completion) => {
                    return Ok(Draft {
                        markdown: writer::normalize_markdown(&completion.content, topic),
                        provider: client.provider().as_str().to_string(),
                        model: completion.model,
                        degraded: false,
                    });
                }
                Err(error) => error,
            }
        }
        Err(error @ LlmError::UnsupportedProvider(_)) => return Err(llm_error(error)),
        Err(error) => error,
    };

    if !fallback_enabled {
        tracing::error!("Blog generation failed: {}", failure);
        return Err(llm_error(failure));
    }

    tracing::warn!("Blog generation failed, using fallback template: {}", failure);
    Ok(Draft {
        markdown: writer::fallback_post(topic),
        provider: writer::FALLBACK_PROVIDER.to_string(),
        model: writer::FALLBACK_MODEL.to_string(),
        degraded: true,
    })
}
