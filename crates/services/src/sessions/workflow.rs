use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use qa_core::model::{Attempt, AttemptNumber, Language, SessionDraft, SessionId, TestSession, Tester};
use qa_core::workflow::{SlotKind, Workflow, WorkflowError, WorkflowState};
use storage::repository::{AttemptRepository, SessionRepository, StorageError};

use super::progress::SessionProgress;
use super::queries::SessionQueries;
use crate::access::AccessPolicy;
use crate::error::{SessionError, TranscriptionError};
use crate::items::ItemSource;
use crate::transcription::Transcriber;
use crate::Clock;

pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of submitting audio for one attempt slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub attempt: Attempt,
    /// Whether the cursor moved; false when a passed slot was overwritten.
    pub advanced: bool,
    pub progress: SessionProgress,
}

/// One async lock per session. Entries nobody holds or waits on are pruned.
#[derive(Clone, Default)]
struct SessionLocks {
    inner: Arc<std::sync::Mutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    async fn acquire(&self, id: SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(id).or_default())
        };
        lock.lock_owned().await
    }
}

/// Orchestrates test runs: start, record attempts, skip, end.
///
/// Every read-check-write sequence runs under the session's lock. The
/// transcription round trip happens outside it, and the slot is checked
/// again once the transcript is back.
#[derive(Clone)]
pub struct TestRunService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    transcriber: Arc<dyn Transcriber>,
    access: AccessPolicy,
    items: ItemSource,
    transcription_timeout: Duration,
    locks: SessionLocks,
}

impl TestRunService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            clock,
            sessions,
            attempts,
            transcriber,
            access: AccessPolicy::allow_all(),
            items: ItemSource::new(),
            transcription_timeout: DEFAULT_TRANSCRIPTION_TIMEOUT,
            locks: SessionLocks::default(),
        }
    }

    #[must_use]
    pub fn with_access_policy(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_shuffle_items(mut self, shuffle: bool) -> Self {
        self.items = self.items.with_shuffle(shuffle);
        self
    }

    #[must_use]
    pub fn with_transcription_timeout(mut self, timeout: Duration) -> Self {
        self.transcription_timeout = timeout;
        self
    }

    /// Create a session from an uploaded CSV, or the language's fallback list
    /// when there is no upload.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AccessDenied`, `SessionError::EmptyItemList`,
    /// `SessionError::ItemFile` or `SessionError::Storage`.
    pub async fn start_session(
        &self,
        tester: Tester,
        language: Language,
        upload: Option<&[u8]>,
    ) -> Result<TestSession, SessionError> {
        if !self.access.permits(&tester) {
            warn!(email = tester.email(), "tester rejected by access policy");
            return Err(SessionError::AccessDenied(tester.email().to_owned()));
        }

        let items = self.items.build(language, upload)?;
        Workflow::new().start(items.len())?;

        let draft = SessionDraft {
            tester,
            language,
            items,
            created_at: self.clock.now(),
        };
        let session = self.sessions.create_session(&draft).await?;
        info!(
            session_id = %session.id(),
            %language,
            items = session.items().len(),
            uploaded = upload.is_some(),
            "test session started"
        );
        Ok(session)
    }

    /// Current progress of a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Storage`.
    pub async fn current(&self, id: SessionId) -> Result<SessionProgress, SessionError> {
        let session = SessionQueries::load(id, self.sessions.as_ref()).await?;
        Ok(SessionProgress::of(session))
    }

    /// Resolve a request for an item page against stored progress.
    ///
    /// Progress is first moved past any attempt already recorded ahead of the
    /// cursor, then the item is checked against it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OutOfRange` carrying the redirect target, or
    /// `SessionError::NotFound` / `SessionError::Storage`.
    pub async fn locate(
        &self,
        id: SessionId,
        item_index: usize,
    ) -> Result<SessionProgress, SessionError> {
        let _guard = self.locks.acquire(id).await;
        let (mut session, attempts) =
            SessionQueries::load_with_attempts(id, self.sessions.as_ref(), self.attempts.as_ref())
                .await?;

        let mut workflow = session.workflow();
        let before = workflow.state();
        let state = workflow.reconcile(SessionQueries::recorded_slots(&session, &attempts));
        if state != before {
            debug!(session_id = %id, stage = state.stage(), "progress caught up with recorded attempts");
            session.apply(state, self.clock.now());
            self.save(&session).await?;
        }

        workflow.locate(item_index)?;
        Ok(SessionProgress::of(session))
    }

    /// Transcribe, score and record one attempt.
    ///
    /// The current slot advances the cursor; an already-passed slot is
    /// overwritten in place. A failed transcription records nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Attempt` for attempt numbers outside 1..=5,
    /// `SessionError::OutOfRange` for future slots, `SessionError::Completed`
    /// for finished sessions, `SessionError::Transcription` when no transcript
    /// could be obtained, or `SessionError::NotFound` / `SessionError::Storage`.
    pub async fn submit_attempt(
        &self,
        id: SessionId,
        item_index: usize,
        attempt_number: u8,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<AttemptOutcome, SessionError> {
        let number = AttemptNumber::new(attempt_number)?;

        let (language, keyword) = {
            let _guard = self.locks.acquire(id).await;
            let session = SessionQueries::load(id, self.sessions.as_ref()).await?;
            session.workflow().check_slot(item_index, number)?;
            (session.language(), keyword_at(&session, item_index, number)?)
        };

        let transcript = self.transcribe(id, audio, mime_type, language).await?;

        let _guard = self.locks.acquire(id).await;
        let mut session = SessionQueries::load(id, self.sessions.as_ref()).await?;
        let mut workflow = session.workflow();
        let kind = match workflow.check_slot(item_index, number) {
            Ok(kind) => kind,
            // A concurrent submission for this slot finished first and completed the run.
            Err(WorkflowError::Completed) => {
                if !self.is_recorded(&session, item_index, number).await? {
                    return Err(SessionError::Completed);
                }
                SlotKind::Passed
            }
            Err(err) => return Err(err.into()),
        };

        let now = self.clock.now();
        let attempt = Attempt::scored(keyword, number, transcript, now);
        match self.attempts.upsert_attempt(id, &attempt).await {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(SessionError::NotFound(id)),
            Err(other) => return Err(other.into()),
        }

        let advanced = kind == SlotKind::Current;
        if advanced {
            let state = workflow.advance()?;
            session.apply(state, now);
            self.save(&session).await?;
        }

        debug!(
            session_id = %id,
            item = %attempt.item,
            attempt = %attempt.number,
            matched = attempt.matched,
            advanced,
            "attempt recorded"
        );
        if session.is_complete() && advanced {
            info!(session_id = %id, "test session complete");
        }

        Ok(AttemptOutcome {
            attempt,
            advanced,
            progress: SessionProgress::of(session),
        })
    }

    /// Move past the current attempt without recording it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` for finished sessions, or
    /// `SessionError::NotFound` / `SessionError::Storage`.
    pub async fn skip_attempt(&self, id: SessionId) -> Result<SessionProgress, SessionError> {
        let _guard = self.locks.acquire(id).await;
        let mut session = SessionQueries::load(id, self.sessions.as_ref()).await?;
        let skipped = session.state();
        let state = session.workflow().advance()?;
        session.apply(state, self.clock.now());
        self.save(&session).await?;
        if let WorkflowState::InProgress {
            item_index,
            attempt,
        } = skipped
        {
            debug!(session_id = %id, item_index, %attempt, "attempt skipped");
        }
        Ok(SessionProgress::of(session))
    }

    /// End the run early. Recorded attempts stay; ending twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Storage`.
    pub async fn end_session(&self, id: SessionId) -> Result<SessionProgress, SessionError> {
        let _guard = self.locks.acquire(id).await;
        let mut session = SessionQueries::load(id, self.sessions.as_ref()).await?;
        if !session.is_complete() {
            let state = session.workflow().end()?;
            session.apply(state, self.clock.now());
            self.save(&session).await?;
            info!(session_id = %id, "test session ended");
        }
        Ok(SessionProgress::of(session))
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_sessions(&self, limit: u32) -> Result<Vec<TestSession>, SessionError> {
        Ok(self.sessions.list_sessions(limit).await?)
    }

    async fn transcribe(
        &self,
        id: SessionId,
        audio: &[u8],
        mime_type: &str,
        language: Language,
    ) -> Result<String, SessionError> {
        let call = self.transcriber.transcribe(audio, mime_type, language);
        match tokio::time::timeout(self.transcription_timeout, call).await {
            Ok(Ok(transcript)) => Ok(transcript),
            Ok(Err(err)) => {
                warn!(session_id = %id, error = %err, "transcription failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(
                    session_id = %id,
                    timeout_secs = self.transcription_timeout.as_secs(),
                    "transcription timed out"
                );
                Err(TranscriptionError::Timeout(self.transcription_timeout).into())
            }
        }
    }

    async fn is_recorded(
        &self,
        session: &TestSession,
        item_index: usize,
        attempt: AttemptNumber,
    ) -> Result<bool, SessionError> {
        let (_, attempts) = SessionQueries::load_with_attempts(
            session.id(),
            self.sessions.as_ref(),
            self.attempts.as_ref(),
        )
        .await?;
        Ok(SessionQueries::recorded_slots(session, &attempts).contains(&(item_index, attempt)))
    }

    async fn save(&self, session: &TestSession) -> Result<(), SessionError> {
        match self.sessions.save_progress(session).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(SessionError::NotFound(session.id())),
            Err(other) => Err(other.into()),
        }
    }
}

fn keyword_at(
    session: &TestSession,
    item_index: usize,
    attempt: AttemptNumber,
) -> Result<String, SessionError> {
    session
        .items()
        .get(item_index)
        .map(|item| item.keyword().to_owned())
        .ok_or(SessionError::OutOfRange {
            item_index,
            attempt: Some(attempt),
            redirect: WorkflowState::Complete,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use qa_core::time::fixed_clock;
    use storage::repository::Storage;

    struct Echo;

    #[async_trait]
    impl Transcriber for Echo {
        async fn transcribe(
            &self,
            audio: &[u8],
            _mime_type: &str,
            _language: Language,
        ) -> Result<String, TranscriptionError> {
            Ok(String::from_utf8_lossy(audio).into_owned())
        }
    }

    fn service() -> TestRunService {
        let storage = Storage::in_memory();
        TestRunService::new(
            fixed_clock(),
            storage.sessions,
            storage.attempts,
            Arc::new(Echo),
        )
    }

    fn tester() -> Tester {
        Tester::new("Asha", "asha@example.com").unwrap()
    }

    #[tokio::test]
    async fn start_rejects_disallowed_domain() {
        let svc = service().with_access_policy(AccessPolicy::with_domains(["farm.example"]));
        let err = svc
            .start_session(tester(), Language::Hindi, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AccessDenied(email) if email == "asha@example.com"));
    }

    #[tokio::test]
    async fn start_without_usable_items_creates_nothing() {
        let svc = service();
        let err = svc
            .start_session(tester(), Language::Odia, Some(b"\n  \n".as_slice()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyItemList));
        assert!(svc.list_sessions(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_attempt_numbers_outside_budget() {
        let svc = service();
        let session = svc
            .start_session(tester(), Language::Hindi, Some("गेहूं".as_bytes()))
            .await
            .unwrap();
        let err = svc
            .submit_attempt(session.id(), 0, 6, "गेहूं".as_bytes(), "audio/wav")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Attempt(_)));
    }

    #[tokio::test]
    async fn session_locks_only_serialize_the_same_session() {
        let locks = SessionLocks::default();
        let held = locks.acquire(SessionId::new(1)).await;

        let other =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(SessionId::new(2))).await;
        assert!(other.is_ok());
        drop(other);

        let same =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(SessionId::new(1))).await;
        assert!(same.is_err());

        drop(held);
        let _again = locks.acquire(SessionId::new(3)).await;
        let entries = locks.inner.lock().unwrap().len();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let svc = service();
        let err = svc.current(SessionId::new(77)).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(id) if id == SessionId::new(77)));
        let err = svc.end_session(SessionId::new(77)).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }
}
