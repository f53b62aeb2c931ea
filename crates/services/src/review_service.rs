use chrono::{DateTime, Utc};
use tracing::debug;

use study_core::model::{
    ReviewItem, ReviewItemId, Stage, StudyLog, StudyLogDraft, StudyLogId, Understanding, UserId,
};
use study_core::scheduler::{ReviewScheduler, StageCompletion, TodayTask};
use study_core::time::Clock;
use storage::repository::{ReviewItemRepository, StudyLogRepository};

use crate::error::ReviewServiceError;

//
// ─── PERSISTED COMPLETION ──────────────────────────────────────────────────────
//

/// Result of a persisted stage completion: the updated item and what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCompletion {
    pub item: ReviewItem,
    pub completion: StageCompletion,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates the review pipeline: logging study sessions, entering units
/// into review, completing stages, and deriving today's task list.
pub struct ReviewService {
    clock: Clock,
    scheduler: ReviewScheduler,
}

impl ReviewService {
    /// Create a review service with the default scheduler and real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: ReviewScheduler::new(),
        }
    }

    /// Create a review service with a custom scheduler (still uses default clock).
    #[must_use]
    pub fn with_scheduler(scheduler: ReviewScheduler) -> Self {
        Self {
            clock: Clock::default(),
            scheduler,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validate and persist a study log.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::StudyLog` if the draft fails validation
    /// and `ReviewServiceError::Storage` if persistence fails.
    pub async fn log_study(
        &self,
        draft: StudyLogDraft,
        logs: &dyn StudyLogRepository,
    ) -> Result<StudyLog, ReviewServiceError> {
        let log = draft.validate(self.now())?.assign_id(StudyLogId::new());
        logs.append_log(&log).await?;
        debug!(log_id = %log.id(), subject = %log.subject(), "study log recorded");
        Ok(log)
    }

    /// Build a review item for a studied unit, scheduling all five stages
    /// from the log's study date.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Item` if the item fails its structural
    /// invariants (not expected for scheduler-generated progress).
    pub fn enter_review(&self, log: &StudyLog) -> Result<ReviewItem, ReviewServiceError> {
        let item = ReviewItem::new(
            ReviewItemId::new(),
            log.user_id(),
            log.id(),
            log.subject(),
            log.unit_label(),
            log.content(),
            ReviewScheduler::initial_progress(log.studied_at()),
            self.now(),
        )?;
        Ok(item)
    }

    /// Build a review item for a studied unit and persist it.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Storage` if insertion fails (including
    /// `Conflict` when the unit already entered the pipeline).
    pub async fn enter_review_persisted(
        &self,
        log: &StudyLog,
        items: &dyn ReviewItemRepository,
    ) -> Result<ReviewItem, ReviewServiceError> {
        let item = self.enter_review(log)?;
        items.insert_item(&item).await?;
        debug!(item_id = %item.id(), "unit entered review pipeline");
        Ok(item)
    }

    /// Apply an understanding score to a stage of an in-memory item.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors (frozen item, out-of-order completion).
    pub fn complete_stage(
        &self,
        item: &mut ReviewItem,
        stage: Stage,
        understanding: Understanding,
    ) -> Result<StageCompletion, ReviewServiceError> {
        let completion = self
            .scheduler
            .complete_stage(item, stage, understanding, self.now())?;
        Ok(completion)
    }

    /// Apply a score and persist the updated item.
    ///
    /// The write carries the pre-mutation version, so a concurrent completion
    /// of the same item from another session surfaces as
    /// `StorageError::Conflict` instead of a lost update. If persistence
    /// fails, the in-memory item is rolled back to its original state.
    ///
    /// # Errors
    ///
    /// Returns scheduler errors for invalid completions and storage errors
    /// (conflict included) unmodified.
    pub async fn complete_stage_persisted(
        &self,
        item: &mut ReviewItem,
        stage: Stage,
        understanding: Understanding,
        items: &dyn ReviewItemRepository,
    ) -> Result<StageCompletion, ReviewServiceError> {
        let original = item.clone();
        let expected_version = item.version();

        let completion = self.complete_stage(item, stage, understanding)?;

        match items.update_item(item, expected_version).await {
            Ok(()) => {
                debug!(item_id = %item.id(), stage = %stage, "stage completion persisted");
                Ok(completion)
            }
            Err(err) => {
                *item = original;
                Err(err.into())
            }
        }
    }

    /// Load an item, apply a score, and persist the update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item is missing, plus every
    /// error `complete_stage_persisted` can produce.
    pub async fn complete_stage_persisted_by_id(
        &self,
        id: ReviewItemId,
        stage: Stage,
        understanding: Understanding,
        items: &dyn ReviewItemRepository,
    ) -> Result<PersistedCompletion, ReviewServiceError> {
        let mut item = items.get_item(id).await?;
        let completion = self
            .complete_stage_persisted(&mut item, stage, understanding, items)
            .await?;
        Ok(PersistedCompletion { item, completion })
    }

    /// Fetch a learner's items and derive the ordered task list for today.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Storage` on repository failures.
    pub async fn today_tasks_for_user(
        &self,
        user_id: UserId,
        items: &dyn ReviewItemRepository,
    ) -> Result<Vec<TodayTask>, ReviewServiceError> {
        let all = items.list_items_for_user(user_id).await?;
        Ok(ReviewScheduler::today_tasks(&all, self.clock.today()))
    }
}

impl Default for ReviewService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
