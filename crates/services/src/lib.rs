#![forbid(unsafe_code)]

pub mod error;
pub mod progress_service;
pub mod review_service;

pub use study_core::Clock;

pub use error::{ProgressServiceError, ReviewServiceError};
pub use progress_service::StudyProgressService;
pub use review_service::{PersistedCompletion, ReviewService};
