use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostVersion {
    pub id: i64,
    pub post_id: i64,
    pub version_number: i64,
    pub markdown: String,
    pub edit_instruction: Option<String>,
    pub parent_version_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostVersionSummary {
    pub id: i64,
    pub version_number: i64,
    pub edit_instruction: Option<String>,
    pub parent_version_id: Option<i64>,
    pub word_count: usize,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostVersionListResponse {
    pub post_id: i64,
    pub versions: Vec<PostVersionSummary>,
    pub current_version_id: Option<i64>,
    pub total_versions: usize,
}
