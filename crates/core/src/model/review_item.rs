use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ReviewItemId, StudyLogId, UserId};
use crate::model::subject::Subject;

/// Number of review checkpoints every item carries.
pub const STAGE_COUNT: usize = 5;

/// Understanding scores at or above this value classify a review as a success.
pub const SUCCESS_THRESHOLD: u8 = 70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors for stage-number construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("stage must be between 1 and 5, got {0}")]
    OutOfRange(u8),
}

/// Errors for understanding-score construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("understanding score must be between 0 and 100, got {0}")]
    OutOfRange(u8),
}

/// Errors raised when a review item fails its structural invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReviewItemError {
    #[error("expected exactly {STAGE_COUNT} stage entries, got {0}")]
    WrongStageCount(usize),

    #[error("stage entries must cover stages 1 through 5 in order, found stage {found} at position {position}")]
    StageOutOfPlace { found: u8, position: usize },

    #[error("stage {0} has a completion date without a score, or a score without a completion date")]
    InconsistentCompletion(u8),

    #[error("item marked completed but its final stage is still pending")]
    CompletedWithoutFinalStage,
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// One of the five fixed review checkpoints (1..=5).
///
/// Each stage carries its fixed offset from the base study date:
/// 1 day, 3 days, 1 week, 2 weeks, 1 month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stage(u8);

impl Stage {
    pub const FIRST: Stage = Stage(1);
    pub const FINAL: Stage = Stage(5);

    /// All stages in ascending order.
    pub const ALL: [Stage; STAGE_COUNT] = [Stage(1), Stage(2), Stage(3), Stage(4), Stage(5)];

    /// Creates a stage from its 1-based number.
    ///
    /// # Errors
    ///
    /// Returns `StageError::OutOfRange` if the value is not in 1..=5.
    pub fn new(value: u8) -> Result<Self, StageError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StageError::OutOfRange(value))
        }
    }

    /// Returns the 1-based stage number.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Days between the base study date and this stage's scheduled review.
    #[must_use]
    pub fn offset_days(self) -> i64 {
        match self.0 {
            1 => 1,
            2 => 3,
            3 => 7,
            4 => 14,
            _ => 30,
        }
    }

    /// Human-readable description of the stage's offset.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "1 day later",
            2 => "3 days later",
            3 => "1 week later",
            4 => "2 weeks later",
            _ => "1 month later",
        }
    }

    /// The stage after this one, or `None` for the final stage.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        if self.0 < 5 { Some(Stage(self.0 + 1)) } else { None }
    }

    #[must_use]
    pub fn is_final(self) -> bool {
        self.0 == 5
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── UNDERSTANDING ─────────────────────────────────────────────────────────────
//

/// A 0..=100 self-assessment submitted when a stage is completed.
///
/// The original application accepted any numeric value here; this type
/// rejects out-of-range scores at construction instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Understanding(u8);

impl Understanding {
    /// Creates a score, rejecting values above 100.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` if the value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ScoreError> {
        if value <= 100 {
            Ok(Self(value))
        } else {
            Err(ScoreError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// True when the score clears the fixed success threshold (70).
    #[must_use]
    pub fn is_success(self) -> bool {
        self.0 >= SUCCESS_THRESHOLD
    }
}

impl fmt::Display for Understanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── STAGE PROGRESS ────────────────────────────────────────────────────────────
//

/// One scheduled review checkpoint within a review item.
///
/// Overdue state is never stored: `is_overdue`/`days_past_due` are computed
/// from the scheduled date and "today" on every call, at day granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    stage: Stage,
    scheduled_date: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    understanding: Option<Understanding>,
}

impl StageProgress {
    /// Creates a pending checkpoint for the given stage.
    #[must_use]
    pub fn pending(stage: Stage, scheduled_date: DateTime<Utc>) -> Self {
        Self {
            stage,
            scheduled_date,
            completed_at: None,
            understanding: None,
        }
    }

    /// Rehydrates a checkpoint from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ReviewItemError::InconsistentCompletion` if exactly one of
    /// `completed_at` and `understanding` is set.
    pub fn from_persisted(
        stage: Stage,
        scheduled_date: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        understanding: Option<Understanding>,
    ) -> Result<Self, ReviewItemError> {
        if completed_at.is_some() != understanding.is_some() {
            return Err(ReviewItemError::InconsistentCompletion(stage.value()));
        }
        Ok(Self {
            stage,
            scheduled_date,
            completed_at,
            understanding,
        })
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn scheduled_date(&self) -> DateTime<Utc> {
        self.scheduled_date
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn understanding(&self) -> Option<Understanding> {
        self.understanding
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// True when the checkpoint's scheduled day has passed without completion.
    ///
    /// A checkpoint scheduled for later today is not overdue.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.scheduled_date.date_naive() < today
    }

    /// Whole days elapsed past the scheduled day; zero when due today or later.
    #[must_use]
    pub fn days_past_due(&self, today: NaiveDate) -> i64 {
        today
            .signed_duration_since(self.scheduled_date.date_naive())
            .num_days()
            .max(0)
    }

    pub(crate) fn complete(&mut self, now: DateTime<Utc>, understanding: Understanding) {
        self.completed_at = Some(now);
        self.understanding = Some(understanding);
    }
}

//
// ─── REVIEW ITEM ───────────────────────────────────────────────────────────────
//

/// One piece of studied content moving through the five-stage review pipeline.
///
/// Invariants: the progress array always holds stages 1..=5 in ascending
/// order; `current_stage` never exceeds the final stage; once `is_completed`
/// is set the item is frozen. `version` is a monotonically increasing
/// optimistic-concurrency token bumped on every mutation and checked by
/// storage on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    id: ReviewItemId,
    user_id: UserId,
    study_log_id: StudyLogId,
    subject: Subject,
    unit_label: String,
    content: String,
    progress: [StageProgress; STAGE_COUNT],
    current_stage: Stage,
    is_completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

fn validate_stage_order(progress: &[StageProgress]) -> Result<(), ReviewItemError> {
    if progress.len() != STAGE_COUNT {
        return Err(ReviewItemError::WrongStageCount(progress.len()));
    }
    for (position, entry) in progress.iter().enumerate() {
        let expected = position as u8 + 1;
        if entry.stage().value() != expected {
            return Err(ReviewItemError::StageOutOfPlace {
                found: entry.stage().value(),
                position,
            });
        }
    }
    Ok(())
}

impl ReviewItem {
    /// Creates a fresh item entering the pipeline at stage 1.
    ///
    /// The progress array comes from the scheduler's `initial_progress`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewItemError` if the progress entries are not stages
    /// 1..=5 in ascending order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReviewItemId,
        user_id: UserId,
        study_log_id: StudyLogId,
        subject: Subject,
        unit_label: impl Into<String>,
        content: impl Into<String>,
        progress: [StageProgress; STAGE_COUNT],
        created_at: DateTime<Utc>,
    ) -> Result<Self, ReviewItemError> {
        validate_stage_order(&progress)?;
        Ok(Self {
            id,
            user_id,
            study_log_id,
            subject,
            unit_label: unit_label.into(),
            content: content.into(),
            progress,
            current_stage: Stage::FIRST,
            is_completed: false,
            created_at,
            updated_at: created_at,
            version: 0,
        })
    }

    /// Rehydrates an item from persisted storage, re-checking every
    /// structural invariant.
    ///
    /// # Errors
    ///
    /// Returns `ReviewItemError::WrongStageCount` / `StageOutOfPlace` if the
    /// progress entries do not cover stages 1..=5 exactly once in order, and
    /// `CompletedWithoutFinalStage` if the item claims completion while its
    /// final stage is pending.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ReviewItemId,
        user_id: UserId,
        study_log_id: StudyLogId,
        subject: Subject,
        unit_label: String,
        content: String,
        progress: Vec<StageProgress>,
        current_stage: Stage,
        is_completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Result<Self, ReviewItemError> {
        validate_stage_order(&progress)?;
        let progress: [StageProgress; STAGE_COUNT] = progress
            .try_into()
            .map_err(|entries: Vec<StageProgress>| ReviewItemError::WrongStageCount(entries.len()))?;

        if is_completed && !progress[STAGE_COUNT - 1].is_completed() {
            return Err(ReviewItemError::CompletedWithoutFinalStage);
        }

        Ok(Self {
            id,
            user_id,
            study_log_id,
            subject,
            unit_label,
            content,
            progress,
            current_stage,
            is_completed,
            created_at,
            updated_at,
            version,
        })
    }

    #[must_use]
    pub fn id(&self) -> ReviewItemId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn study_log_id(&self) -> StudyLogId {
        self.study_log_id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn unit_label(&self) -> &str {
        &self.unit_label
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// All five checkpoints, stage-ascending.
    #[must_use]
    pub fn progress(&self) -> &[StageProgress; STAGE_COUNT] {
        &self.progress
    }

    /// The checkpoint for a specific stage.
    #[must_use]
    pub fn stage_progress(&self, stage: Stage) -> &StageProgress {
        &self.progress[usize::from(stage.value() - 1)]
    }

    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    /// The checkpoint for the stage the learner should act on next.
    #[must_use]
    pub fn current_progress(&self) -> &StageProgress {
        self.stage_progress(self.current_stage)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Optimistic-concurrency token checked by storage on write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn stage_progress_mut(&mut self, stage: Stage) -> &mut StageProgress {
        &mut self.progress[usize::from(stage.value() - 1)]
    }

    pub(crate) fn advance_to(&mut self, stage: Stage) {
        self.current_stage = stage;
    }

    pub(crate) fn mark_completed(&mut self) {
        self.current_stage = Stage::FINAL;
        self.is_completed = true;
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
