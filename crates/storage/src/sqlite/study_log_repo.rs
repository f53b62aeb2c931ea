use study_core::model::{StudyLog, StudyLogId, Subject, UserId};

use super::{SqliteRepository, mapping::map_study_log_row};
use crate::repository::{StorageError, StudyLogRepository};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl StudyLogRepository for SqliteRepository {
    async fn append_log(&self, log: &StudyLog) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO study_logs (
                    id, user_id, subject, unit_label, content,
                    duration_minutes, understanding, studied_at, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    subject = excluded.subject,
                    unit_label = excluded.unit_label,
                    content = excluded.content,
                    duration_minutes = excluded.duration_minutes,
                    understanding = excluded.understanding,
                    studied_at = excluded.studied_at
            ",
        )
        .bind(log.id().to_string())
        .bind(log.user_id().to_string())
        .bind(log.subject().as_str())
        .bind(log.unit_label())
        .bind(log.content())
        .bind(i64::from(log.duration_minutes()))
        .bind(i64::from(log.understanding().value()))
        .bind(log.studied_at())
        .bind(log.created_at())
        .execute(self.pool())
        .await
        .map_err(conn_err)?;
        Ok(())
    }

    async fn get_log(&self, id: StudyLogId) -> Result<StudyLog, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, subject, unit_label, content,
                       duration_minutes, understanding, studied_at, created_at
                FROM study_logs
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(conn_err)?
        .ok_or(StorageError::NotFound)?;

        map_study_log_row(&row)
    }

    async fn list_logs_for_user(&self, user_id: UserId) -> Result<Vec<StudyLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, subject, unit_label, content,
                       duration_minutes, understanding, studied_at, created_at
                FROM study_logs
                WHERE user_id = ?1
                ORDER BY studied_at ASC, id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_study_log_row(&row)?);
        }
        Ok(out)
    }

    async fn list_logs_for_subject(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<Vec<StudyLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, subject, unit_label, content,
                       duration_minutes, understanding, studied_at, created_at
                FROM study_logs
                WHERE user_id = ?1 AND subject = ?2
                ORDER BY studied_at ASC, id ASC
            ",
        )
        .bind(user_id.to_string())
        .bind(subject.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_study_log_row(&row)?);
        }
        Ok(out)
    }
}
