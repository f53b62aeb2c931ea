use sqlx::{Row, Sqlite, Transaction};

use study_core::model::{ReviewItem, ReviewItemId, StageProgress, UserId};

use super::{
    SqliteRepository,
    mapping::{map_item_row, map_stage_row, stage_to_i64, understanding_to_i64, version_to_i64},
};
use crate::repository::{ReviewItemRepository, StorageError};

fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn replace_stage_rows(
    tx: &mut Transaction<'_, Sqlite>,
    item: &ReviewItem,
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM review_stages WHERE item_id = ?1")
        .bind(item.id().to_string())
        .execute(&mut **tx)
        .await
        .map_err(conn_err)?;

    for progress in item.progress() {
        sqlx::query(
            r"
                INSERT INTO review_stages (item_id, stage, scheduled_date, completed_at, understanding)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(item.id().to_string())
        .bind(stage_to_i64(progress.stage()))
        .bind(progress.scheduled_date())
        .bind(progress.completed_at())
        .bind(understanding_to_i64(progress.understanding()))
        .execute(&mut **tx)
        .await
        .map_err(conn_err)?;
    }
    Ok(())
}

async fn load_stage_rows(
    repo: &SqliteRepository,
    item_id: &str,
) -> Result<Vec<StageProgress>, StorageError> {
    let rows = sqlx::query(
        r"
            SELECT stage, scheduled_date, completed_at, understanding
            FROM review_stages
            WHERE item_id = ?1
            ORDER BY stage ASC
        ",
    )
    .bind(item_id)
    .fetch_all(repo.pool())
    .await
    .map_err(conn_err)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_stage_row(&row)?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl ReviewItemRepository for SqliteRepository {
    async fn insert_item(&self, item: &ReviewItem) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn_err)?;

        sqlx::query(
            r"
                INSERT INTO review_items (
                    id, user_id, study_log_id, subject, unit_label, content,
                    current_stage, is_completed, created_at, updated_at, version
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(item.id().to_string())
        .bind(item.user_id().to_string())
        .bind(item.study_log_id().to_string())
        .bind(item.subject().as_str())
        .bind(item.unit_label())
        .bind(item.content())
        .bind(stage_to_i64(item.current_stage()))
        .bind(item.is_completed())
        .bind(item.created_at())
        .bind(item.updated_at())
        .bind(version_to_i64(item.version())?)
        .execute(&mut *tx)
        .await
        .map_err(insert_err)?;

        replace_stage_rows(&mut tx, item).await?;
        tx.commit().await.map_err(conn_err)
    }

    async fn update_item(
        &self,
        item: &ReviewItem,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn_err)?;

        let result = sqlx::query(
            r"
                UPDATE review_items SET
                    user_id = ?2, study_log_id = ?3, subject = ?4, unit_label = ?5,
                    content = ?6, current_stage = ?7, is_completed = ?8,
                    created_at = ?9, updated_at = ?10, version = ?11
                WHERE id = ?1 AND version = ?12
            ",
        )
        .bind(item.id().to_string())
        .bind(item.user_id().to_string())
        .bind(item.study_log_id().to_string())
        .bind(item.subject().as_str())
        .bind(item.unit_label())
        .bind(item.content())
        .bind(stage_to_i64(item.current_stage()))
        .bind(item.is_completed())
        .bind(item.created_at())
        .bind(item.updated_at())
        .bind(version_to_i64(item.version())?)
        .bind(version_to_i64(expected_version)?)
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM review_items WHERE id = ?1")
                .bind(item.id().to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn_err)?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        replace_stage_rows(&mut tx, item).await?;
        tx.commit().await.map_err(conn_err)
    }

    async fn get_item(&self, id: ReviewItemId) -> Result<ReviewItem, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, study_log_id, subject, unit_label, content,
                       current_stage, is_completed, created_at, updated_at, version
                FROM review_items
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        let progress = load_stage_rows(self, &id.to_string()).await?;
        map_item_row(&row, progress)
    }

    async fn list_items_for_user(&self, user_id: UserId) -> Result<Vec<ReviewItem>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, study_log_id, subject, unit_label, content,
                       current_stage, is_completed, created_at, updated_at, version
                FROM review_items
                WHERE user_id = ?1
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let item_id: String = row
                .try_get("id")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let progress = load_stage_rows(self, &item_id).await?;
            out.push(map_item_row(&row, progress)?);
        }
        Ok(out)
    }
}
