mod ids;
mod review_item;
mod study_log;
mod subject;

pub use ids::{ParseIdError, ReviewItemId, StudyLogId, UserId};
pub use review_item::{
    ReviewItem, ReviewItemError, ScoreError, STAGE_COUNT, SUCCESS_THRESHOLD, Stage, StageError,
    StageProgress, Understanding,
};
pub use study_log::{StudyLog, StudyLogDraft, StudyLogError, ValidatedStudyLog};
pub use subject::{Subject, SubjectError};
