use sqlx::Row;

use study_core::model::{
    ReviewItem, ReviewItemId, Stage, StageProgress, StudyLog, StudyLogId, Subject, Understanding,
    UserId,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn item_id_from_str(s: &str) -> Result<ReviewItemId, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn log_id_from_str(s: &str) -> Result<StudyLogId, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn subject_from_str(s: &str) -> Result<Subject, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn stage_from_i64(v: i64) -> Result<Stage, StorageError> {
    let raw = u8::try_from(v).map_err(|_| StorageError::Serialization(format!("stage overflow: {v}")))?;
    Stage::new(raw).map_err(ser)
}

pub(crate) fn stage_to_i64(stage: Stage) -> i64 {
    i64::from(stage.value())
}

pub(crate) fn understanding_from_i64(v: Option<i64>) -> Result<Option<Understanding>, StorageError> {
    v.map(|raw| {
        let raw = u8::try_from(raw)
            .map_err(|_| StorageError::Serialization(format!("understanding overflow: {raw}")))?;
        Understanding::new(raw).map_err(ser)
    })
    .transpose()
}

pub(crate) fn understanding_to_i64(u: Option<Understanding>) -> Option<i64> {
    u.map(|score| i64::from(score.value()))
}

pub(crate) fn version_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("negative version: {v}")))
}

pub(crate) fn version_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("version overflow".into()))
}

pub(crate) fn duration_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("duration out of range: {v}")))
}

pub(crate) fn map_study_log_row(row: &sqlx::sqlite::SqliteRow) -> Result<StudyLog, StorageError> {
    let id = log_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let subject = subject_from_str(&row.try_get::<String, _>("subject").map_err(ser)?)?;

    let duration_minutes =
        duration_from_i64(row.try_get::<i64, _>("duration_minutes").map_err(ser)?)?;
    let understanding = understanding_from_i64(Some(
        row.try_get::<i64, _>("understanding").map_err(ser)?,
    ))?
    .ok_or_else(|| StorageError::Serialization("missing understanding".into()))?;

    StudyLog::from_persisted(
        id,
        user_id,
        subject,
        row.try_get("unit_label").map_err(ser)?,
        row.try_get("content").map_err(ser)?,
        duration_minutes,
        understanding,
        row.try_get("studied_at").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_stage_row(row: &sqlx::sqlite::SqliteRow) -> Result<StageProgress, StorageError> {
    let stage = stage_from_i64(row.try_get::<i64, _>("stage").map_err(ser)?)?;
    let understanding =
        understanding_from_i64(row.try_get::<Option<i64>, _>("understanding").map_err(ser)?)?;

    StageProgress::from_persisted(
        stage,
        row.try_get("scheduled_date").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        understanding,
    )
    .map_err(ser)
}

pub(crate) fn map_item_row(
    row: &sqlx::sqlite::SqliteRow,
    progress: Vec<StageProgress>,
) -> Result<ReviewItem, StorageError> {
    let id = item_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let study_log_id = log_id_from_str(&row.try_get::<String, _>("study_log_id").map_err(ser)?)?;
    let subject = subject_from_str(&row.try_get::<String, _>("subject").map_err(ser)?)?;
    let current_stage = stage_from_i64(row.try_get::<i64, _>("current_stage").map_err(ser)?)?;
    let version = version_from_i64(row.try_get::<i64, _>("version").map_err(ser)?)?;

    ReviewItem::from_persisted(
        id,
        user_id,
        study_log_id,
        subject,
        row.try_get("unit_label").map_err(ser)?,
        row.try_get("content").map_err(ser)?,
        progress,
        current_stage,
        row.try_get::<bool, _>("is_completed").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
        version,
    )
    .map_err(ser)
}
