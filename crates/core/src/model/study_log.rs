use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{StudyLogId, UserId};
use crate::model::review_item::{ScoreError, Understanding};
use crate::model::subject::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while validating a study log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudyLogError {
    #[error("unit label must not be empty")]
    EmptyUnitLabel,

    #[error("study duration must be at least one minute")]
    ZeroDuration,

    #[error(transparent)]
    Score(#[from] ScoreError),
}

//
// ─── STUDY LOG ─────────────────────────────────────────────────────────────────
//

/// Unvalidated study-session input as collected from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLogDraft {
    pub user_id: UserId,
    pub subject: Subject,
    pub unit_label: String,
    pub content: String,
    pub duration_minutes: u32,
    pub understanding: u8,
    pub studied_at: DateTime<Utc>,
}

impl StudyLogDraft {
    /// Validate the draft into a log ready for id assignment.
    ///
    /// # Errors
    ///
    /// Returns `StudyLogError` if the unit label is blank, the duration is
    /// zero, or the understanding score is out of range.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedStudyLog, StudyLogError> {
        let unit_label = self.unit_label.trim().to_string();
        if unit_label.is_empty() {
            return Err(StudyLogError::EmptyUnitLabel);
        }
        if self.duration_minutes == 0 {
            return Err(StudyLogError::ZeroDuration);
        }
        let understanding = Understanding::new(self.understanding)?;

        Ok(ValidatedStudyLog {
            user_id: self.user_id,
            subject: self.subject,
            unit_label,
            content: self.content,
            duration_minutes: self.duration_minutes,
            understanding,
            studied_at: self.studied_at,
            created_at: now,
        })
    }
}

/// A validated study log awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStudyLog {
    user_id: UserId,
    subject: Subject,
    unit_label: String,
    content: String,
    duration_minutes: u32,
    understanding: Understanding,
    studied_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl ValidatedStudyLog {
    #[must_use]
    pub fn assign_id(self, id: StudyLogId) -> StudyLog {
        StudyLog {
            id,
            user_id: self.user_id,
            subject: self.subject,
            unit_label: self.unit_label,
            content: self.content,
            duration_minutes: self.duration_minutes,
            understanding: self.understanding,
            studied_at: self.studied_at,
            created_at: self.created_at,
        }
    }
}

/// One logged study session; the record a review item links back to.
///
/// `studied_at` is the base date all five review offsets are computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLog {
    id: StudyLogId,
    user_id: UserId,
    subject: Subject,
    unit_label: String,
    content: String,
    duration_minutes: u32,
    understanding: Understanding,
    studied_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl StudyLog {
    /// Rehydrate a log from persisted storage, re-checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `StudyLogError` if the persisted fields fail validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: StudyLogId,
        user_id: UserId,
        subject: Subject,
        unit_label: String,
        content: String,
        duration_minutes: u32,
        understanding: Understanding,
        studied_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StudyLogError> {
        if unit_label.trim().is_empty() {
            return Err(StudyLogError::EmptyUnitLabel);
        }
        if duration_minutes == 0 {
            return Err(StudyLogError::ZeroDuration);
        }
        Ok(Self {
            id,
            user_id,
            subject,
            unit_label,
            content,
            duration_minutes,
            understanding,
            studied_at,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> StudyLogId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
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

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn understanding(&self) -> Understanding {
        self.understanding
    }

    #[must_use]
    pub fn studied_at(&self) -> DateTime<Utc> {
        self.studied_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
