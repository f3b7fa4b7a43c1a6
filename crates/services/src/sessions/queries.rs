use qa_core::model::{Attempt, SessionId, TestSession};
use storage::repository::{AttemptRepository, SessionRepository, StorageError};

use crate::error::SessionError;

/// Storage-backed lookups shared by the session services.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Fetch a session, reporting a missing row as `SessionError::NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Storage`.
    pub async fn load(
        id: SessionId,
        sessions: &dyn SessionRepository,
    ) -> Result<TestSession, SessionError> {
        match sessions.get_session(id).await {
            Ok(session) => Ok(session),
            Err(StorageError::NotFound) => Err(SessionError::NotFound(id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Fetch a session together with every attempt recorded for it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Storage`.
    pub async fn load_with_attempts(
        id: SessionId,
        sessions: &dyn SessionRepository,
        attempts: &dyn AttemptRepository,
    ) -> Result<(TestSession, Vec<Attempt>), SessionError> {
        let session = Self::load(id, sessions).await?;
        let recorded = match attempts.list_attempts(id).await {
            Ok(recorded) => recorded,
            Err(StorageError::NotFound) => return Err(SessionError::NotFound(id)),
            Err(other) => return Err(other.into()),
        };
        Ok((session, recorded))
    }

    /// Recorded slots as `(item_index, attempt)` pairs, ignoring unknown items.
    pub fn recorded_slots(
        session: &TestSession,
        attempts: &[Attempt],
    ) -> Vec<(usize, qa_core::model::AttemptNumber)> {
        attempts
            .iter()
            .filter_map(|a| {
                session
                    .items()
                    .position_of(&a.item)
                    .map(|index| (index, a.number))
            })
            .collect()
    }
}
