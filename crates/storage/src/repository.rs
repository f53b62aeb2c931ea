use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::{ReviewItem, ReviewItemId, StudyLog, StudyLogId, Subject, UserId};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The stored record's version did not match the caller's expectation.
    #[error("version conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for review items.
///
/// Writes replace the whole record, matching the document-store semantics the
/// rest of the system assumes. Updates are guarded by an optimistic version
/// check so concurrent completions of the same item cannot silently overwrite
/// each other.
#[async_trait]
pub trait ReviewItemRepository: Send + Sync {
    /// Persist a brand-new item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an item with the same id already
    /// exists, or other storage errors.
    async fn insert_item(&self, item: &ReviewItem) -> Result<(), StorageError>;

    /// Replace a stored item, but only when its stored version equals
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item is missing and
    /// `StorageError::Conflict` if another writer got there first.
    async fn update_item(
        &self,
        item: &ReviewItem,
        expected_version: u64,
    ) -> Result<(), StorageError>;

    /// Fetch an item by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_item(&self, id: ReviewItemId) -> Result<ReviewItem, StorageError>;

    /// Fetch all items owned by a learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_items_for_user(&self, user_id: UserId) -> Result<Vec<ReviewItem>, StorageError>;
}

/// Repository contract for study logs.
#[async_trait]
pub trait StudyLogRepository: Send + Sync {
    /// Persist a study log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be stored.
    async fn append_log(&self, log: &StudyLog) -> Result<(), StorageError>;

    /// Fetch a log by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_log(&self, id: StudyLogId) -> Result<StudyLog, StorageError>;

    /// Fetch all logs for a learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_logs_for_user(&self, user_id: UserId) -> Result<Vec<StudyLog>, StorageError>;

    /// Fetch a learner's logs for one subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_logs_for_subject(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<Vec<StudyLog>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<HashMap<ReviewItemId, ReviewItem>>>,
    logs: Arc<Mutex<HashMap<StudyLogId, StudyLog>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            logs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ReviewItemRepository for InMemoryRepository {
    async fn insert_item(&self, item: &ReviewItem) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&item.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(item.id(), item.clone());
        Ok(())
    }

    async fn update_item(
        &self,
        item: &ReviewItem,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let stored = guard.get(&item.id()).ok_or(StorageError::NotFound)?;
        if stored.version() != expected_version {
            return Err(StorageError::Conflict);
        }
        guard.insert(item.id(), item.clone());
        Ok(())
    }

    async fn get_item(&self, id: ReviewItemId) -> Result<ReviewItem, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_items_for_user(&self, user_id: UserId) -> Result<Vec<ReviewItem>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<ReviewItem> = guard
            .values()
            .filter(|item| item.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|item| (item.created_at(), item.id()));
        Ok(found)
    }
}

#[async_trait]
impl StudyLogRepository for InMemoryRepository {
    async fn append_log(&self, log: &StudyLog) -> Result<(), StorageError> {
        let mut guard = self
            .logs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(log.id(), log.clone());
        Ok(())
    }

    async fn get_log(&self, id: StudyLogId) -> Result<StudyLog, StorageError> {
        let guard = self
            .logs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_logs_for_user(&self, user_id: UserId) -> Result<Vec<StudyLog>, StorageError> {
        let guard = self
            .logs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<StudyLog> = guard
            .values()
            .filter(|log| log.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|log| (log.studied_at(), log.id()));
        Ok(found)
    }

    async fn list_logs_for_subject(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<Vec<StudyLog>, StorageError> {
        let logs = self.list_logs_for_user(user_id).await?;
        Ok(logs
            .into_iter()
            .filter(|log| log.subject() == subject)
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ReviewItemRepository>,
    pub logs: Arc<dyn StudyLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let items: Arc<dyn ReviewItemRepository> = Arc::new(repo.clone());
        let logs: Arc<dyn StudyLogRepository> = Arc::new(repo);
        Self { items, logs }
    }
}
