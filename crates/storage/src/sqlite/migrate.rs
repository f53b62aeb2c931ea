use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (study logs, review items with their five stage
/// rows, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS study_logs (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    unit_label TEXT NOT NULL,
                    content TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                    understanding INTEGER NOT NULL CHECK (understanding BETWEEN 0 AND 100),
                    studied_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // study_log_id is a soft link; the originating log may be deleted
        // independently of the item, so no foreign key.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_items (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    study_log_id TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    unit_label TEXT NOT NULL,
                    content TEXT NOT NULL,
                    current_stage INTEGER NOT NULL CHECK (current_stage BETWEEN 1 AND 5),
                    is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    version INTEGER NOT NULL CHECK (version >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_stages (
                    item_id TEXT NOT NULL,
                    stage INTEGER NOT NULL CHECK (stage BETWEEN 1 AND 5),
                    scheduled_date TEXT NOT NULL,
                    completed_at TEXT,
                    understanding INTEGER CHECK (understanding BETWEEN 0 AND 100),
                    PRIMARY KEY (item_id, stage),
                    FOREIGN KEY (item_id) REFERENCES review_items(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_review_items_user ON review_items(user_id);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_study_logs_user_subject ON study_logs(user_id, subject);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
