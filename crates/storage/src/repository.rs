use async_trait::async_trait;
use qa_core::model::{Attempt, AttemptNumber, SessionDraft, SessionId, TestSession};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for test sessions and their progress.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn create_session(&self, draft: &SessionDraft) -> Result<TestSession, StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError>;

    /// Persist workflow progress (state and completion time).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn save_progress(&self, session: &TestSession) -> Result<(), StorageError>;

    /// Most recently created sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_sessions(&self, limit: u32) -> Result<Vec<TestSession>, StorageError>;
}

/// Repository contract for recorded attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Insert or overwrite the slot `(session, attempt.item, attempt.number)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session or its item does not exist.
    async fn upsert_attempt(
        &self,
        session_id: SessionId,
        attempt: &Attempt,
    ) -> Result<(), StorageError>;

    /// All attempts for a session, in item order then attempt order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_attempts(&self, session_id: SessionId) -> Result<Vec<Attempt>, StorageError>;
}

type AttemptKey = (SessionId, String, AttemptNumber);

/// Simple in-memory repository implementation for testing and single-process runs.
#[derive(Clone)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, TestSession>>>,
    attempts: Arc<Mutex<BTreeMap<AttemptKey, Attempt>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            attempts: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<TestSession, StorageError> {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = draft.clone().into_session(id);
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn save_progress(&self, session: &TestSession) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let stored = guard.get_mut(&session.id()).ok_or(StorageError::NotFound)?;
        *stored = session.clone();
        Ok(())
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<TestSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sessions: Vec<TestSession> = guard.values().cloned().collect();
        sessions.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        sessions.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(sessions)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn upsert_attempt(
        &self,
        session_id: SessionId,
        attempt: &Attempt,
    ) -> Result<(), StorageError> {
        {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let session = sessions.get(&session_id).ok_or(StorageError::NotFound)?;
            if session.items().position_of(&attempt.item).is_none() {
                return Err(StorageError::NotFound);
            }
        }

        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (session_id, attempt.item.clone(), attempt.number),
            attempt.clone(),
        );
        Ok(())
    }

    async fn list_attempts(&self, session_id: SessionId) -> Result<Vec<Attempt>, StorageError> {
        let session = self.get_session(session_id).await?;
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Attempt> = guard
            .iter()
            .filter(|((sid, _, _), _)| *sid == session_id)
            .map(|(_, attempt)| attempt.clone())
            .collect();
        found.sort_by_key(|a| (session.items().position_of(&a.item), a.number));
        Ok(found)
    }
}

/// Aggregates session and attempt repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { sessions, attempts }
    }
}
