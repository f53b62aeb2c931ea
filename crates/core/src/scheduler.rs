use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;

use crate::model::{ReviewItem, STAGE_COUNT, Stage, StageProgress, Understanding};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("stage {stage} is not the item's current stage ({current})")]
    StageNotCurrent { stage: u8, current: u8 },

    #[error("stage {0} is already completed")]
    StageAlreadyCompleted(u8),

    #[error("item has already completed all five stages")]
    ItemAlreadyCompleted,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Behavior switches for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    /// Permit completing a stage other than the item's current one, and
    /// re-completing an already-completed stage (overwriting its score and
    /// completion time). The original application tolerated both; off by
    /// default so the usual stage order is enforced.
    pub allow_out_of_order_completion: bool,
}

//
// ─── COMPLETION RESULT ─────────────────────────────────────────────────────────
//

/// Classification of a submitted understanding score.
///
/// Scores at or above the fixed threshold of 70 count as a success; the
/// statistics layer aggregates these classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    Failure,
}

impl StageOutcome {
    #[must_use]
    pub fn from_score(score: Understanding) -> Self {
        if score.is_success() {
            StageOutcome::Success
        } else {
            StageOutcome::Failure
        }
    }
}

/// What changed on an item when a stage was completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCompletion {
    pub stage: Stage,
    pub completed_at: DateTime<Utc>,
    pub understanding: Understanding,
    pub outcome: StageOutcome,
    /// True when this completion finished the final stage and closed the item.
    pub item_completed: bool,
}

//
// ─── TODAY TASK ────────────────────────────────────────────────────────────────
//

/// A currently-actionable review stage, derived fresh on every query and
/// never persisted. Carries the full item so callers can render it without a
/// second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayTask {
    pub item: ReviewItem,
    pub stage: Stage,
    pub scheduled_date: DateTime<Utc>,
    pub is_overdue: bool,
    pub days_past_due: i64,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Fixed-interval spaced-repetition scheduler.
///
/// Every item gets five checkpoints at 1, 3, 7, 14, and 30 days after its
/// base study date. The scheduler is stateless: every operation is a pure
/// function of its inputs plus an explicit "now", except `complete_stage`,
/// which mutates the caller-owned item it is handed.
#[derive(Debug, Clone, Default)]
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

impl ReviewScheduler {
    /// Create a scheduler with the default configuration (stage order enforced).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Build the five pending checkpoints for a unit studied on `base_date`.
    ///
    /// `base_date` may be any date, past or present; it is never validated
    /// against the future. Output is stage-ascending with scheduled dates at
    /// `base_date` + 1/3/7/14/30 days.
    #[must_use]
    pub fn initial_progress(base_date: DateTime<Utc>) -> [StageProgress; STAGE_COUNT] {
        Stage::ALL
            .map(|stage| StageProgress::pending(stage, base_date + Duration::days(stage.offset_days())))
    }

    /// Record an understanding score for one of the item's stages.
    ///
    /// Sets the stage's completion time and score, then advances
    /// `current_stage` to `stage + 1` (completing the final stage closes the
    /// item instead). Only completing stage 5 ever closes the item, no matter
    /// which stages were completed before it.
    ///
    /// # Errors
    ///
    /// - `ItemAlreadyCompleted` if the item has finished all five stages;
    ///   a closed item is frozen regardless of configuration.
    /// - `StageNotCurrent` / `StageAlreadyCompleted` when stage order is
    ///   enforced (the default) and the request deviates from it.
    pub fn complete_stage(
        &self,
        item: &mut ReviewItem,
        stage: Stage,
        understanding: Understanding,
        now: DateTime<Utc>,
    ) -> Result<StageCompletion, SchedulerError> {
        if item.is_completed() {
            return Err(SchedulerError::ItemAlreadyCompleted);
        }
        if !self.config.allow_out_of_order_completion {
            if stage != item.current_stage() {
                return Err(SchedulerError::StageNotCurrent {
                    stage: stage.value(),
                    current: item.current_stage().value(),
                });
            }
            if item.stage_progress(stage).is_completed() {
                return Err(SchedulerError::StageAlreadyCompleted(stage.value()));
            }
        }

        item.stage_progress_mut(stage).complete(now, understanding);
        match stage.next() {
            Some(next) => item.advance_to(next),
            None => item.mark_completed(),
        }
        item.touch(now);

        Ok(StageCompletion {
            stage,
            completed_at: now,
            understanding,
            outcome: StageOutcome::from_score(understanding),
            item_completed: stage.is_final(),
        })
    }

    /// True when the checkpoint's scheduled day has passed without
    /// completion, comparing at day granularity.
    #[must_use]
    pub fn is_overdue(progress: &StageProgress, today: NaiveDate) -> bool {
        progress.is_overdue(today)
    }

    /// Whole days past the scheduled day; zero when due today or in the future.
    #[must_use]
    pub fn days_past_due(progress: &StageProgress, today: NaiveDate) -> i64 {
        progress.days_past_due(today)
    }

    /// Select and order the actionable review stages across `items`.
    ///
    /// Only each incomplete item's current stage is considered; it yields a
    /// task when still pending and scheduled on-or-before `today`. Overdue
    /// tasks sort first, then by scheduled date ascending; ties keep their
    /// input order.
    #[must_use]
    pub fn today_tasks(items: &[ReviewItem], today: NaiveDate) -> Vec<TodayTask> {
        let mut tasks: Vec<TodayTask> = items
            .iter()
            .filter(|item| !item.is_completed())
            .filter_map(|item| {
                let progress = item.current_progress();
                if progress.is_completed() || progress.scheduled_date().date_naive() > today {
                    return None;
                }
                Some(TodayTask {
                    stage: progress.stage(),
                    scheduled_date: progress.scheduled_date(),
                    is_overdue: progress.is_overdue(today),
                    days_past_due: progress.days_past_due(today),
                    item: item.clone(),
                })
            })
            .collect();

        // sort_by_key is stable, so equal keys preserve input order
        tasks.sort_by_key(|task| (!task.is_overdue, task.scheduled_date));
        tasks
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReviewItemId, StudyLogId, Subject, UserId};
    use crate::time::fixed_now;
    use chrono::TimeZone;

    fn score(value: u8) -> Understanding {
        Understanding::new(value).unwrap()
    }

    fn build_item(base_date: DateTime<Utc>) -> ReviewItem {
        ReviewItem::new(
            ReviewItemId::new(),
            UserId::new(),
            StudyLogId::new(),
            Subject::Math,
            "Fractions",
            "Adding unlike denominators",
            ReviewScheduler::initial_progress(base_date),
            base_date,
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn initial_progress_follows_fixed_table() {
        let base = fixed_now();
        let progress = ReviewScheduler::initial_progress(base);

        assert_eq!(progress.len(), 5);
        for (entry, (stage, offset)) in progress
            .iter()
            .zip([(1_u8, 1_i64), (2, 3), (3, 7), (4, 14), (5, 30)])
        {
            assert_eq!(entry.stage().value(), stage);
            assert_eq!(entry.scheduled_date(), base + Duration::days(offset));
            assert!(!entry.is_completed());
        }
    }

    #[test]
    fn initial_progress_accepts_past_base_dates() {
        let base = fixed_now() - Duration::days(400);
        let progress = ReviewScheduler::initial_progress(base);
        assert_eq!(progress[0].scheduled_date(), base + Duration::days(1));
    }

    #[test]
    fn completing_stages_in_order_advances_to_completion() {
        let scheduler = ReviewScheduler::new();
        let mut item = build_item(fixed_now());

        for stage in Stage::ALL {
            assert!(!item.is_completed());
            assert_eq!(item.current_stage(), stage);
            let completion = scheduler
                .complete_stage(&mut item, stage, score(85), fixed_now() + Duration::days(1))
                .unwrap();
            assert_eq!(completion.item_completed, stage.is_final());
        }

        assert!(item.is_completed());
        assert_eq!(item.current_stage(), Stage::FINAL);
    }

    #[test]
    fn unit_is_not_completed_before_final_stage() {
        let scheduler = ReviewScheduler::new();
        let mut item = build_item(fixed_now());

        for stage in &Stage::ALL[..4] {
            scheduler
                .complete_stage(&mut item, *stage, score(95), fixed_now())
                .unwrap();
            assert!(!item.is_completed());
        }
        assert_eq!(item.current_stage(), Stage::FINAL);
    }

    #[test]
    fn completing_a_stage_bumps_version_and_updated_at() {
        let scheduler = ReviewScheduler::new();
        let mut item = build_item(fixed_now());
        let later = fixed_now() + Duration::days(2);

        scheduler
            .complete_stage(&mut item, Stage::FIRST, score(75), later)
            .unwrap();

        assert_eq!(item.version(), 1);
        assert_eq!(item.updated_at(), later);
        let first = item.stage_progress(Stage::FIRST);
        assert_eq!(first.completed_at(), Some(later));
        assert_eq!(first.understanding(), Some(score(75)));
    }

    #[test]
    fn out_of_order_completion_is_rejected_by_default() {
        let scheduler = ReviewScheduler::new();
        let mut item = build_item(fixed_now());

        let err = scheduler
            .complete_stage(&mut item, Stage::new(3).unwrap(), score(80), fixed_now())
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::StageNotCurrent { stage: 3, current: 1 }
        ));
        assert!(!item.stage_progress(Stage::new(3).unwrap()).is_completed());
    }

    #[test]
    fn out_of_order_completion_can_be_allowed() {
        let scheduler = ReviewScheduler::with_config(SchedulerConfig {
            allow_out_of_order_completion: true,
        });
        let mut item = build_item(fixed_now());

        // Completing stage 3 out of order pulls the current stage to 4.
        scheduler
            .complete_stage(&mut item, Stage::new(3).unwrap(), score(60), fixed_now())
            .unwrap();
        assert_eq!(item.current_stage(), Stage::new(4).unwrap());
        assert!(!item.is_completed());

        // Re-completion overwrites the stored score.
        let redo = fixed_now() + Duration::days(1);
        scheduler
            .complete_stage(&mut item, Stage::new(3).unwrap(), score(90), redo)
            .unwrap();
        let third = item.stage_progress(Stage::new(3).unwrap());
        assert_eq!(third.understanding(), Some(score(90)));
        assert_eq!(third.completed_at(), Some(redo));
    }

    #[test]
    fn only_stage_five_completes_the_unit_even_out_of_order() {
        let scheduler = ReviewScheduler::with_config(SchedulerConfig {
            allow_out_of_order_completion: true,
        });
        let mut item = build_item(fixed_now());

        for stage in &Stage::ALL[..4] {
            scheduler
                .complete_stage(&mut item, *stage, score(100), fixed_now())
                .unwrap();
        }
        assert!(!item.is_completed());

        let completion = scheduler
            .complete_stage(&mut item, Stage::FINAL, score(100), fixed_now())
            .unwrap();
        assert!(completion.item_completed);
        assert!(item.is_completed());
    }

    #[test]
    fn completed_item_is_frozen_regardless_of_config() {
        for allow in [false, true] {
            let scheduler = ReviewScheduler::with_config(SchedulerConfig {
                allow_out_of_order_completion: allow,
            });
            let mut item = build_item(fixed_now());
            for stage in Stage::ALL {
                scheduler
                    .complete_stage(&mut item, stage, score(80), fixed_now())
                    .unwrap();
            }

            let err = scheduler
                .complete_stage(&mut item, Stage::FINAL, score(80), fixed_now())
                .unwrap_err();
            assert!(matches!(err, SchedulerError::ItemAlreadyCompleted));
        }
    }

    #[test]
    fn recompleting_current_stage_is_rejected_by_default() {
        let scheduler = ReviewScheduler::with_config(SchedulerConfig {
            allow_out_of_order_completion: true,
        });
        let mut item = build_item(fixed_now());
        scheduler
            .complete_stage(&mut item, Stage::FIRST, score(50), fixed_now())
            .unwrap();

        // Stage 1 is no longer current, so a strict scheduler refuses it.
        let strict = ReviewScheduler::new();
        let err = strict
            .complete_stage(&mut item, Stage::FIRST, score(80), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::StageNotCurrent { .. }));
    }

    #[test]
    fn already_completed_current_stage_reports_stage_already_completed() {
        let lenient = ReviewScheduler::with_config(SchedulerConfig {
            allow_out_of_order_completion: true,
        });
        let mut item = build_item(fixed_now());

        // Complete stage 2 out of order; current stage becomes 3. Then
        // complete stage 2 again via a strict scheduler after advancing back.
        lenient
            .complete_stage(&mut item, Stage::new(2).unwrap(), score(80), fixed_now())
            .unwrap();
        lenient
            .complete_stage(&mut item, Stage::FIRST, score(80), fixed_now())
            .unwrap();
        assert_eq!(item.current_stage(), Stage::new(2).unwrap());

        let strict = ReviewScheduler::new();
        let err = strict
            .complete_stage(&mut item, Stage::new(2).unwrap(), score(80), fixed_now())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::StageAlreadyCompleted(2)));
    }

    #[test]
    fn threshold_classifies_success_and_failure() {
        let scheduler = ReviewScheduler::new();

        let mut item = build_item(fixed_now());
        let success = scheduler
            .complete_stage(&mut item, Stage::FIRST, score(70), fixed_now())
            .unwrap();
        assert_eq!(success.outcome, StageOutcome::Success);

        let mut other = build_item(fixed_now());
        let failure = scheduler
            .complete_stage(&mut other, Stage::FIRST, score(69), fixed_now())
            .unwrap();
        assert_eq!(failure.outcome, StageOutcome::Failure);
    }

    #[test]
    fn today_tasks_excludes_completed_and_future_items() {
        let scheduler = ReviewScheduler::new();
        let base = date(2024, 1, 1);

        // Item studied long ago and fully completed.
        let mut done = build_item(base - Duration::days(90));
        for stage in Stage::ALL {
            scheduler
                .complete_stage(&mut done, stage, score(90), base)
                .unwrap();
        }

        // Item studied today: stage 1 is due tomorrow, so nothing is actionable.
        let fresh = build_item(base);

        let tasks = ReviewScheduler::today_tasks(&[done, fresh], base.date_naive());
        assert!(tasks.is_empty());
    }

    #[test]
    fn today_tasks_orders_overdue_first_then_by_date() {
        let today = date(2024, 3, 10).date_naive();

        // A: overdue, due 3 days ago. B: overdue, due 1 day ago. C: due today.
        let a = build_item(date(2024, 3, 6));
        let b = build_item(date(2024, 3, 8));
        let c = build_item(date(2024, 3, 9));

        let tasks = ReviewScheduler::today_tasks(&[a.clone(), b.clone(), c.clone()], today);

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].item.id(), a.id());
        assert!(tasks[0].is_overdue);
        assert_eq!(tasks[0].days_past_due, 3);
        assert_eq!(tasks[1].item.id(), b.id());
        assert_eq!(tasks[1].days_past_due, 1);
        assert_eq!(tasks[2].item.id(), c.id());
        assert!(!tasks[2].is_overdue);
        assert_eq!(tasks[2].days_past_due, 0);
    }

    #[test]
    fn today_tasks_ties_keep_input_order() {
        let base = date(2024, 3, 1);
        let first = build_item(base);
        let second = build_item(base);

        let today = (base + Duration::days(1)).date_naive();
        let tasks = ReviewScheduler::today_tasks(&[first.clone(), second.clone()], today);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].item.id(), first.id());
        assert_eq!(tasks[1].item.id(), second.id());
    }

    #[test]
    fn today_tasks_surfaces_only_the_current_stage() {
        let scheduler = ReviewScheduler::with_config(SchedulerConfig {
            allow_out_of_order_completion: true,
        });
        let base = date(2024, 1, 1);
        let mut item = build_item(base);

        // Skip ahead: complete stage 2 out of order so current becomes 3
        // while stage 1 is still pending and long overdue.
        scheduler
            .complete_stage(&mut item, Stage::new(2).unwrap(), score(80), base)
            .unwrap();

        let today = (base + Duration::days(60)).date_naive();
        let tasks = ReviewScheduler::today_tasks(std::slice::from_ref(&item), today);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].stage, Stage::new(3).unwrap());
    }

    #[test]
    fn same_day_scheduled_stage_is_due_but_not_overdue() {
        let base = date(2024, 5, 1);
        let item = build_item(base);

        // Stage 1 is scheduled for May 2; evaluate on May 2 itself.
        let today = (base + Duration::days(1)).date_naive();
        let tasks = ReviewScheduler::today_tasks(std::slice::from_ref(&item), today);

        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].is_overdue);
        assert_eq!(tasks[0].days_past_due, 0);
    }

    #[test]
    fn end_to_end_scenario_from_new_year() {
        let scheduler = ReviewScheduler::new();
        let studied = date(2024, 1, 1);
        let mut item = build_item(studied);

        assert_eq!(
            item.stage_progress(Stage::FIRST).scheduled_date(),
            studied + Duration::days(1)
        );

        let today = date(2024, 1, 5).date_naive();
        let tasks = ReviewScheduler::today_tasks(std::slice::from_ref(&item), today);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].stage, Stage::FIRST);
        assert!(tasks[0].is_overdue);
        assert_eq!(tasks[0].days_past_due, 3);

        scheduler
            .complete_stage(&mut item, Stage::FIRST, score(85), date(2024, 1, 5))
            .unwrap();
        assert_eq!(item.current_stage(), Stage::new(2).unwrap());
        assert!(item.stage_progress(Stage::FIRST).is_completed());

        // Stage 2 was scheduled for Jan 4, so it is already a day overdue.
        let tasks = ReviewScheduler::today_tasks(std::slice::from_ref(&item), today);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].stage, Stage::new(2).unwrap());
        assert!(tasks[0].is_overdue);
        assert_eq!(tasks[0].days_past_due, 1);
    }
}
