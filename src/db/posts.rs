use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use sqlx::FromRow;

use super::{Database, DbError};
use crate::models::{Article, BlogPost, BlogStats, Image, NewBlogPost, PostVersion};

const POST_COLUMNS: &str = "id, topic, markdown, word_count, source_refs, images, metadata, \
                            provider, model, current_version_id, created_at, updated_at";

#[derive(Debug, FromRow)]
struct BlogPostRow {
    id: i64,
    topic: String,
    markdown: String,
    word_count: i64,
    source_refs: Option<String>,
    images: Option<String>,
    metadata: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    current_version_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<BlogPostRow> for BlogPost {
    type Error = DbError;

    fn try_from(row: BlogPostRow) -> Result<Self, Self::Error> {
        let sources: Vec<Article> = decode_json(row.source_refs.as_deref(), "source_refs")?;
        let images: Vec<Image> = decode_json(row.images.as_deref(), "images")?;
        let metadata: Value = match row.metadata.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                .map_err(|source| DbError::Json {
                    column: "metadata",
                    source,
                })?,
            _ => Value::Object(Default::default()),
        };

        let from_metadata = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let provider = row
            .provider
            .or_else(|| from_metadata("provider"))
            .unwrap_or_else(|| "unknown".to_string());
        let model = row
            .model
            .or_else(|| from_metadata("model"))
            .unwrap_or_else(|| "unknown".to_string());

        // Rows written before word counts were stored report 0.
        let word_count = if row.word_count > 0 {
            row.word_count
        } else {
            row.markdown.split_whitespace().count() as i64
        };

        Ok(BlogPost {
            id: row.id,
            topic: row.topic,
            markdown: row.markdown,
            word_count,
            sources,
            images,
            provider,
            model,
            metadata,
            current_version_id: row.current_version_id,
            created_at: row.created_at,
            updated_at: row.updated_at.unwrap_or(row.created_at),
        })
    }
}

fn decode_json<T: serde::de::DeserializeOwned + Default>(
    raw: Option<&str>,
    column: &'static str,
) -> Result<T, DbError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(raw).map_err(|source| DbError::Json { column, source })
        }
        _ => Ok(T::default()),
    }
}

fn encode_json<T: serde::Serialize>(value: &T, column: &'static str) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|source| DbError::Json { column, source })
}

fn count_words(markdown: &str) -> i64 {
    markdown.split_whitespace().count() as i64
}

impl Database {
    /// Insert a post together with its first version, and point the post at that version.
    pub async fn create_post(&self, new_post: &NewBlogPost) -> Result<BlogPost, DbError> {
        let now = Utc::now();
        let word_count = count_words(&new_post.markdown);
        let source_refs = encode_json(&new_post.sources, "source_refs")?;
        let images = encode_json(&new_post.images, "images")?;
        let metadata = encode_json(&new_post.metadata, "metadata")?;

        let mut tx = self.writer().begin().await?;

        let post_id = sqlx::query(
            r#"
            INSERT INTO blog_posts
                (topic, markdown, word_count, source_refs, images, metadata, provider, model, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_post.topic)
        .bind(&new_post.markdown)
        .bind(word_count)
        .bind(&source_refs)
        .bind(&images)
        .bind(&metadata)
        .bind(&new_post.provider)
        .bind(&new_post.model)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let version_id = sqlx::query(
            r#"
            INSERT INTO blog_post_versions
                (post_id, version_number, markdown, edit_instruction, parent_version_id, created_at)
            VALUES (?, 1, ?, 'Initial version', NULL, ?)
            "#,
        )
        .bind(post_id)
        .bind(&new_post.markdown)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE blog_posts SET current_version_id = ? WHERE id = ?")
            .bind(version_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(post_id, "Saved blog post");

        Ok(BlogPost {
            id: post_id,
            topic: new_post.topic.clone(),
            markdown: new_post.markdown.clone(),
            word_count,
            sources: new_post.sources.clone(),
            images: new_post.images.clone(),
            provider: new_post.provider.clone(),
            model: new_post.model.clone(),
            metadata: new_post.metadata.clone(),
            current_version_id: Some(version_id),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Option<BlogPost>, DbError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?");
        let row = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(post_id)
            .fetch_optional(self.pool())
            .await?;

        row.map(BlogPost::try_from).transpose()
    }

    /// Newest first.
    pub async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<BlogPost>, DbError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(BlogPost::try_from).collect()
    }

    pub async fn count_posts(&self) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Substring match on topic or body, newest first.
    pub async fn search_posts(&self, query: &str, limit: i64) -> Result<Vec<BlogPost>, DbError> {
        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts \
             WHERE topic LIKE ? OR markdown LIKE ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, BlogPostRow>(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(BlogPost::try_from).collect()
    }

    /// Append a new version and make it current. `None` when the post does not exist.
    pub async fn update_post_content(
        &self,
        post_id: i64,
        markdown: &str,
        edit_instruction: Option<&str>,
    ) -> Result<Option<PostVersion>, DbError> {
        let mut tx = self.writer().begin().await?;

        let current: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT current_version_id FROM blog_posts WHERE id = ?")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((parent_version_id,)) = current else {
            tracing::warn!(post_id, "Cannot update missing blog post");
            return Ok(None);
        };

        let (max_version,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(version_number) FROM blog_post_versions WHERE post_id = ?")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?;
        let version_number = max_version.unwrap_or(0) + 1;
        let instruction = edit_instruction
            .map(str::to_string)
            .unwrap_or_else(|| format!("Edit #{}", version_number));
        let now = Utc::now();

        let version_id = sqlx::query(
            r#"
            INSERT INTO blog_post_versions
                (post_id, version_number, markdown, edit_instruction, parent_version_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(version_number)
        .bind(markdown)
        .bind(&instruction)
        .bind(parent_version_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            UPDATE blog_posts
            SET markdown = ?, word_count = ?, current_version_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(markdown)
        .bind(count_words(markdown))
        .bind(version_id)
        .bind(now)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(post_id, version_number, "Updated blog post");

        Ok(Some(PostVersion {
            id: version_id,
            post_id,
            version_number,
            markdown: markdown.to_string(),
            edit_instruction: Some(instruction),
            parent_version_id,
            created_at: now,
        }))
    }

    /// All versions of a post, oldest first.
    pub async fn get_post_versions(&self, post_id: i64) -> Result<Vec<PostVersion>, DbError> {
        let versions = sqlx::query_as::<_, PostVersion>(
            r#"
            SELECT id, post_id, version_number, markdown, edit_instruction, parent_version_id, created_at
            FROM blog_post_versions
            WHERE post_id = ?
            ORDER BY version_number ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await?;
        Ok(versions)
    }

    /// Remove a post and its versions. `false` when nothing was deleted.
    pub async fn delete_post(&self, post_id: i64) -> Result<bool, DbError> {
        let mut tx = self.writer().begin().await?;

        sqlx::query("DELETE FROM blog_post_versions WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted > 0 {
            tracing::info!(post_id, "Deleted blog post");
        } else {
            tracing::warn!(post_id, "Blog post not found for deletion");
        }
        Ok(deleted > 0)
    }

    pub async fn get_stats(&self) -> Result<BlogStats, DbError> {
        let (total_posts, total_words): (i64, Option<i64>) =
            sqlx::query_as("SELECT COUNT(*), SUM(word_count) FROM blog_posts")
                .fetch_one(self.pool())
                .await?;
        let (total_versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_post_versions")
            .fetch_one(self.pool())
            .await?;

        let cutoff = Utc::now() - ChronoDuration::days(7);
        let (recent_posts,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE created_at > ?")
                .bind(cutoff)
                .fetch_one(self.pool())
                .await?;

        let total_words = total_words.unwrap_or(0);
        let avg_words_per_post = if total_posts > 0 {
            (total_words as f64 / total_posts as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(BlogStats {
            total_posts,
            total_versions,
            total_words,
            recent_posts,
            avg_words_per_post,
        })
    }
}
