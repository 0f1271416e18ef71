use sqlx::SqlitePool;

/// Apply pending schema migrations in order. Each version runs once and is
/// recorded in `schema_migrations`.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        tracing::debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (version,): (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Posts and their edit versions.
async fn run_migration_v1(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            markdown TEXT NOT NULL,
            source_refs TEXT,
            images TEXT,
            metadata TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_post_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            version_number INTEGER NOT NULL,
            markdown TEXT NOT NULL,
            edit_instruction TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (post_id) REFERENCES blog_posts(id) ON DELETE CASCADE,
            UNIQUE(post_id, version_number)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created_at ON blog_posts(created_at)")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_topic ON blog_posts(topic)")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_versions_post_id ON blog_post_versions(post_id)")
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Generation details on posts and the version chain pointers.
async fn run_migration_v2(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    ensure_column(pool, "blog_posts", "word_count", "INTEGER NOT NULL DEFAULT 0").await?;
    ensure_column(pool, "blog_posts", "provider", "TEXT").await?;
    ensure_column(pool, "blog_posts", "model", "TEXT").await?;
    ensure_column(pool, "blog_posts", "current_version_id", "INTEGER").await?;
    ensure_column(pool, "blog_post_versions", "parent_version_id", "INTEGER").await?;

    backfill_word_counts(pool).await?;

    // Posts saved before versioning existed get their stored content as version 1.
    let inserted = sqlx::query(
        r#"
        INSERT INTO blog_post_versions
            (post_id, version_number, markdown, edit_instruction, parent_version_id, created_at)
        SELECT p.id, 1, p.markdown, 'Initial version', NULL, COALESCE(p.created_at, CURRENT_TIMESTAMP)
        FROM blog_posts p
        WHERE NOT EXISTS (SELECT 1 FROM blog_post_versions v WHERE v.post_id = p.id)
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();
    if inserted > 0 {
        tracing::info!(posts = inserted, "Created initial versions for unversioned posts");
    }

    // Older databases: point every post at its highest version.
    sqlx::query(
        r#"
        UPDATE blog_posts
        SET current_version_id = (
            SELECT v.id FROM blog_post_versions v
            WHERE v.post_id = blog_posts.id
            ORDER BY v.version_number DESC
            LIMIT 1
        )
        WHERE current_version_id IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Word counts for rows stored before the column existed.
async fn backfill_word_counts(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, markdown FROM blog_posts WHERE word_count = 0")
            .fetch_all(pool)
            .await?;

    for (post_id, markdown) in rows {
        let word_count = markdown.split_whitespace().count() as i64;
        if word_count == 0 {
            continue;
        }
        sqlx::query("UPDATE blog_posts SET word_count = ? WHERE id = ?")
            .bind(word_count)
            .bind(post_id)
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn ensure_column(
    pool: &SqlitePool,
    table_name: &str,
    column_name: &str,
    column_definition: &str,
) -> Result<(), sqlx::Error> {
    let (existing_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table_name)
            .bind(column_name)
            .fetch_one(pool)
            .await?;

    if existing_count == 0 {
        let alter_sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table_name, column_name, column_definition
        );
        sqlx::query(&alter_sql).execute(pool).await?;
    }

    Ok(())
}
