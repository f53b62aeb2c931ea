use study_core::model::{Subject, UserId};
use study_core::reporting::{StudyProgressSummary, compute_study_progress};
use study_core::time::Clock;
use storage::repository::{ReviewItemRepository, StudyLogRepository};

use crate::error::ProgressServiceError;

/// Read-only reporting over a learner's study logs and review pipeline.
pub struct StudyProgressService {
    clock: Clock,
}

impl StudyProgressService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Compute one summary per requested subject for a learner.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on repository failures.
    pub async fn summaries_for_user(
        &self,
        user_id: UserId,
        subjects: &[Subject],
        items: &dyn ReviewItemRepository,
        logs: &dyn StudyLogRepository,
    ) -> Result<Vec<StudyProgressSummary>, ProgressServiceError> {
        let items = items.list_items_for_user(user_id).await?;
        let logs = logs.list_logs_for_user(user_id).await?;
        Ok(compute_study_progress(
            &items,
            &logs,
            subjects,
            self.clock.today(),
        ))
    }
}

impl Default for StudyProgressService {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review_service::ReviewService;
    use chrono::Duration;
    use study_core::model::StudyLogDraft;
    use study_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn draft(user_id: UserId, subject: Subject, unit: &str, understanding: u8, days_ago: i64) -> StudyLogDraft {
        StudyLogDraft {
            user_id,
            subject,
            unit_label: unit.into(),
            content: String::new(),
            duration_minutes: 20,
            understanding,
            studied_at: fixed_now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn summaries_combine_logs_and_pipeline_state() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let reviews = ReviewService::new().with_clock(Clock::fixed(fixed_now()));
        let progress = StudyProgressService::new().with_clock(Clock::fixed(fixed_now()));

        // Two math logs for the same unit, one entered into review 5 days ago
        // (stage 1 due 4 days ago, so it is overdue today).
        let log = reviews
            .log_study(draft(user, Subject::Math, "Fractions", 85, 5), &repo)
            .await
            .unwrap();
        reviews.enter_review_persisted(&log, &repo).await.unwrap();
        reviews
            .log_study(draft(user, Subject::Math, "Fractions", 95, 2), &repo)
            .await
            .unwrap();

        let summaries = progress
            .summaries_for_user(user, &[Subject::Math, Subject::Science], &repo, &repo)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        let math = &summaries[0];
        assert_eq!(math.subject, Subject::Math);
        assert_eq!(math.total_units, 1);
        assert_eq!(math.completed_units, 1);
        assert_eq!(math.pending_reviews, 1);
        assert_eq!(math.overdue_reviews, 1);
        assert_eq!(math.total_minutes, 40);
        assert_eq!(math.last_studied_at, Some(fixed_now() - Duration::days(2)));

        let science = &summaries[1];
        assert_eq!(science.total_units, 0);
        assert_eq!(science.last_studied_at, None);
    }
}
