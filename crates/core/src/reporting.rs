use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::model::{ReviewItem, StudyLog, Subject};

/// Minimum average understanding for a unit to count as completed in
/// per-subject summaries. Distinct from the per-stage success threshold (70).
pub const GOOD_UNDERSTANDING_THRESHOLD: f64 = 80.0;

/// Per-subject rollup of study activity and review pipeline state.
///
/// A subject with no logs yields zeroes and `last_studied_at = None` rather
/// than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyProgressSummary {
    pub subject: Subject,
    /// Distinct unit labels among the subject's logs.
    pub total_units: usize,
    /// Units whose average understanding reaches the good threshold.
    pub completed_units: usize,
    /// Review items for the subject still in the pipeline.
    pub pending_reviews: usize,
    /// Pending items whose current stage is overdue as of `today`.
    pub overdue_reviews: usize,
    pub average_understanding: f64,
    pub total_minutes: u64,
    pub last_studied_at: Option<DateTime<Utc>>,
}

/// Compute one summary per requested subject.
///
/// Pure and read-only: the inputs are whatever slice of the learner's data
/// the caller fetched, and `today` drives the overdue classification.
#[must_use]
pub fn compute_study_progress(
    items: &[ReviewItem],
    logs: &[StudyLog],
    subjects: &[Subject],
    today: NaiveDate,
) -> Vec<StudyProgressSummary> {
    subjects
        .iter()
        .map(|&subject| summarize_subject(subject, items, logs, today))
        .collect()
}

fn summarize_subject(
    subject: Subject,
    items: &[ReviewItem],
    logs: &[StudyLog],
    today: NaiveDate,
) -> StudyProgressSummary {
    // Per-unit score accumulation: (score sum, log count), keyed by label.
    let mut per_unit: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    let mut score_sum = 0_u64;
    let mut score_count = 0_u64;
    let mut total_minutes = 0_u64;
    let mut last_studied_at: Option<DateTime<Utc>> = None;

    for log in logs.iter().filter(|log| log.subject() == subject) {
        let entry = per_unit.entry(log.unit_label()).or_insert((0, 0));
        entry.0 = entry.0.saturating_add(u64::from(log.understanding().value()));
        entry.1 = entry.1.saturating_add(1);

        score_sum = score_sum.saturating_add(u64::from(log.understanding().value()));
        score_count = score_count.saturating_add(1);
        total_minutes = total_minutes.saturating_add(u64::from(log.duration_minutes()));

        if last_studied_at.is_none_or(|latest| log.studied_at() > latest) {
            last_studied_at = Some(log.studied_at());
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let average_understanding = if score_count == 0 {
        0.0
    } else {
        score_sum as f64 / score_count as f64
    };

    #[allow(clippy::cast_precision_loss)]
    let completed_units = per_unit
        .values()
        .filter(|(sum, count)| *count > 0 && *sum as f64 / *count as f64 >= GOOD_UNDERSTANDING_THRESHOLD)
        .count();

    let pending: Vec<&ReviewItem> = items
        .iter()
        .filter(|item| item.subject() == subject && !item.is_completed())
        .collect();
    let overdue_reviews = pending
        .iter()
        .filter(|item| item.current_progress().is_overdue(today))
        .count();

    StudyProgressSummary {
        subject,
        total_units: per_unit.len(),
        completed_units,
        pending_reviews: pending.len(),
        overdue_reviews,
        average_understanding,
        total_minutes,
        last_studied_at,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ReviewItem, ReviewItemId, Stage, StudyLog, StudyLogDraft, StudyLogId, Understanding,
        UserId,
    };
    use crate::scheduler::ReviewScheduler;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build_log(subject: Subject, unit: &str, understanding: u8, minutes: u32, days_ago: i64) -> StudyLog {
        StudyLogDraft {
            user_id: UserId::new(),
            subject,
            unit_label: unit.into(),
            content: String::new(),
            duration_minutes: minutes,
            understanding,
            studied_at: fixed_now() - Duration::days(days_ago),
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(StudyLogId::new())
    }

    fn build_item(subject: Subject, base: chrono::DateTime<Utc>) -> ReviewItem {
        ReviewItem::new(
            ReviewItemId::new(),
            UserId::new(),
            StudyLogId::new(),
            subject,
            "Unit",
            "",
            ReviewScheduler::initial_progress(base),
            base,
        )
        .unwrap()
    }

    #[test]
    fn subject_without_logs_yields_zeroes() {
        let summaries =
            compute_study_progress(&[], &[], &[Subject::History], fixed_now().date_naive());

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.total_units, 0);
        assert_eq!(summary.completed_units, 0);
        assert_eq!(summary.pending_reviews, 0);
        assert_eq!(summary.overdue_reviews, 0);
        assert_eq!(summary.average_understanding, 0.0);
        assert_eq!(summary.total_minutes, 0);
        assert_eq!(summary.last_studied_at, None);
    }

    #[test]
    fn distinct_units_and_averages_are_counted_per_subject() {
        let logs = vec![
            build_log(Subject::Math, "Fractions", 90, 30, 5),
            build_log(Subject::Math, "Fractions", 80, 20, 3),
            build_log(Subject::Math, "Geometry", 60, 40, 1),
            build_log(Subject::English, "Essays", 70, 25, 2),
        ];

        let summaries = compute_study_progress(
            &[],
            &logs,
            &[Subject::Math, Subject::English],
            fixed_now().date_naive(),
        );

        let math = &summaries[0];
        assert_eq!(math.total_units, 2);
        // Fractions averages 85 (completed); Geometry averages 60.
        assert_eq!(math.completed_units, 1);
        assert!((math.average_understanding - (90.0 + 80.0 + 60.0) / 3.0).abs() < f64::EPSILON);
        assert_eq!(math.total_minutes, 90);
        assert_eq!(math.last_studied_at, Some(fixed_now() - Duration::days(1)));

        let english = &summaries[1];
        assert_eq!(english.total_units, 1);
        assert_eq!(english.completed_units, 0);
        assert_eq!(english.total_minutes, 25);
    }

    #[test]
    fn pending_and_overdue_reviews_track_pipeline_state() {
        let scheduler = ReviewScheduler::new();
        let today = fixed_now().date_naive();

        // Overdue: studied 10 days ago, stage 1 was due 9 days ago.
        let overdue = build_item(Subject::Math, fixed_now() - Duration::days(10));

        // Pending but not overdue: studied today, stage 1 due tomorrow.
        let waiting = build_item(Subject::Math, fixed_now());

        // Fully completed item should not count at all.
        let mut done = build_item(Subject::Math, fixed_now() - Duration::days(60));
        for stage in Stage::ALL {
            scheduler
                .complete_stage(&mut done, stage, Understanding::new(90).unwrap(), fixed_now())
                .unwrap();
        }

        let summaries = compute_study_progress(
            &[overdue, waiting, done],
            &[],
            &[Subject::Math],
            today,
        );

        let math = &summaries[0];
        assert_eq!(math.pending_reviews, 2);
        assert_eq!(math.overdue_reviews, 1);
    }

    #[test]
    fn good_threshold_boundary_is_inclusive() {
        let logs = vec![
            build_log(Subject::Science, "Cells", 80, 10, 1),
            build_log(Subject::Science, "Optics", 79, 10, 1),
        ];

        let summaries =
            compute_study_progress(&[], &logs, &[Subject::Science], fixed_now().date_naive());

        assert_eq!(summaries[0].total_units, 2);
        assert_eq!(summaries[0].completed_units, 1);
    }
}
