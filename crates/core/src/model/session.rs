use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ItemList, Language, SessionId, TestItem, Tester};
use crate::workflow::{Workflow, WorkflowState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("completed_at is before created_at")]
    InvalidTimeRange,

    #[error("session state is {stage} but completed_at is {completed}")]
    CompletionMismatch {
        stage: &'static str,
        completed: &'static str,
    },
}

/// Everything needed to open a session before the sink assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub tester: Tester,
    pub language: Language,
    pub items: ItemList,
    pub created_at: DateTime<Utc>,
}

impl SessionDraft {
    /// Attach the storage-assigned id; the session starts at the first attempt
    /// of the first item.
    #[must_use]
    pub fn into_session(self, id: SessionId) -> TestSession {
        TestSession {
            id,
            tester: self.tester,
            language: self.language,
            items: self.items,
            state: WorkflowState::START,
            created_at: self.created_at,
            completed_at: None,
        }
    }
}

/// One tester's run over an ordered item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSession {
    id: SessionId,
    tester: Tester,
    language: Language,
    items: ItemList,
    state: WorkflowState,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TestSession {
    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if timestamps and state disagree.
    pub fn from_persisted(
        id: SessionId,
        tester: Tester,
        language: Language,
        items: ItemList,
        state: WorkflowState,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        let state = Workflow::resume(items.len(), state).state();
        if let Some(done) = completed_at {
            if done < created_at {
                return Err(SessionStateError::InvalidTimeRange);
            }
        }
        if state.is_complete() != completed_at.is_some() {
            return Err(SessionStateError::CompletionMismatch {
                stage: state.stage(),
                completed: if completed_at.is_some() { "set" } else { "unset" },
            });
        }

        Ok(Self {
            id,
            tester,
            language,
            items,
            state,
            created_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn tester(&self) -> &Tester {
        &self.tester
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn items(&self) -> &ItemList {
        &self.items
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// The item the tester should record next, if any.
    #[must_use]
    pub fn current_item(&self) -> Option<&TestItem> {
        self.state
            .cursor()
            .and_then(|(item_index, _)| self.items.get(item_index))
    }

    /// State machine positioned at this session's progress.
    #[must_use]
    pub fn workflow(&self) -> Workflow {
        Workflow::resume(self.items.len(), self.state)
    }

    /// Store new progress; entering `Complete` stamps `completed_at` once.
    pub fn apply(&mut self, state: WorkflowState, at: DateTime<Utc>) {
        self.state = state;
        if state.is_complete() && self.completed_at.is_none() {
            self.completed_at = Some(at.max(self.created_at));
        }
    }
}
