//! Shared error types for the services crate.

use thiserror::Error;

use study_core::model::{ReviewItemError, StudyLogError};
use study_core::scheduler::SchedulerError;
use storage::repository::StorageError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Item(#[from] ReviewItemError),
    #[error(transparent)]
    StudyLog(#[from] StudyLogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudyProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
