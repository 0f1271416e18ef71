use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::article::Article;
use super::image::Image;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub topic: String,
    pub markdown: String,
    pub word_count: i64,
    pub sources: Vec<Article>,
    pub images: Vec<Image>,
    pub provider: String,
    pub model: String,
    pub metadata: Value,
    pub current_version_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for persisting a freshly generated post.
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub topic: String,
    pub markdown: String,
    pub sources: Vec<Article>,
    pub images: Vec<Image>,
    pub provider: String,
    pub model: String,
    pub metadata: Value,
}

#[derive(Debug, Serialize)]
pub struct BlogPostResponse {
    pub id: String,
    pub topic: String,
    pub content: String,
    pub word_count: i64,
    pub references: Vec<Article>,
    pub images: Vec<Image>,
    pub provider: String,
    pub model: String,
    pub metadata: Value,
    pub current_version_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BlogPost> for BlogPostResponse {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id.to_string(),
            topic: post.topic,
            content: post.markdown,
            word_count: post.word_count,
            references: post.sources,
            images: post.images,
            provider: post.provider,
            model: post.model,
            metadata: post.metadata,
            current_version_id: post.current_version_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub topic: String,
    pub word_count: i64,
    pub sources_count: usize,
    pub images_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BlogPost> for PostSummary {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            topic: post.topic.clone(),
            word_count: post.word_count,
            sources_count: post.sources.len(),
            images_count: post.images.len(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct PostQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<PostSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogStats {
    pub total_posts: i64,
    pub total_versions: i64,
    pub total_words: i64,
    /// Posts created in the last 7 days.
    pub recent_posts: i64,
    pub avg_words_per_post: f64,
}
