mod migrations;
mod posts;

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

const READER_POOL_SIZE: u32 = 5;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in column {column}: {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// SQLite storage. Reads share a small pool; every write goes through a
/// single-connection pool so writers never contend for the database lock.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    writer: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub async fn new(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DbError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(10));

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        migrations::run(&writer).await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(READER_POOL_SIZE)
            .connect_with(options)
            .await?;

        tracing::info!(path = %path.display(), "Database initialized");
        Ok(Self { pool, writer })
    }

    /// Pool for read-only queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Single-connection pool that serializes all writes.
    pub fn writer(&self) -> &SqlitePool {
        &self.writer
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
