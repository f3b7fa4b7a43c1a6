//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use qa_core::model::{AttemptError, AttemptNumber, ItemError, SessionId, TesterError};
use qa_core::workflow::{WorkflowError, WorkflowState};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `Transcriber`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TranscriptionError {
    #[error("transcription is not configured")]
    Disabled,
    #[error("transcription did not finish within {0:?}")]
    Timeout(Duration),
    #[error("transcription request failed with status {0}: {1}")]
    HttpStatus(reqwest::StatusCode, String),
    #[error("transcription response has no transcript")]
    MissingTranscript,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors raised while reading transcription settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TranscriptionConfigError {
    #[error("invalid transcription url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors emitted while turning an upload into an item list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ItemSourceError {
    #[error("no usable items in the supplied list")]
    EmptyItemList,
    #[error("unreadable item file: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Item(ItemError),
}

impl From<ItemError> for ItemSourceError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::EmptyItemList => Self::EmptyItemList,
            other => Self::Item(other),
        }
    }
}

/// Errors emitted by `TestRunService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no usable items in the supplied list")]
    EmptyItemList,
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session already completed")]
    Completed,
    #[error("session has no items yet")]
    NotStarted,
    #[error("item {item_index} attempt {attempt:?} is out of range")]
    OutOfRange {
        item_index: usize,
        attempt: Option<AttemptNumber>,
        redirect: WorkflowState,
    },
    #[error("{0} is not allowed to run tests")]
    AccessDenied(String),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Item(ItemError),
    #[error(transparent)]
    Workflow(WorkflowError),
    #[error(transparent)]
    Tester(#[from] TesterError),
    #[error("unreadable item file: {0}")]
    ItemFile(csv::Error),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<WorkflowError> for SessionError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::EmptyItemList => Self::EmptyItemList,
            WorkflowError::NotStarted => Self::NotStarted,
            WorkflowError::Completed => Self::Completed,
            WorkflowError::OutOfRange {
                item_index,
                attempt,
                redirect,
            } => Self::OutOfRange {
                item_index,
                attempt,
                redirect,
            },
            other => Self::Workflow(other),
        }
    }
}

impl From<ItemSourceError> for SessionError {
    fn from(err: ItemSourceError) -> Self {
        match err {
            ItemSourceError::EmptyItemList => Self::EmptyItemList,
            ItemSourceError::Csv(e) => Self::ItemFile(e),
            ItemSourceError::Item(e) => Self::Item(e),
        }
    }
}

/// Errors emitted while rendering CSV exports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("failed to flush export: {0}")]
    Flush(String),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    TranscriptionConfig(#[from] TranscriptionConfigError),
}
