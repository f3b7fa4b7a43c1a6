use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qa_core::model::LanguageError;
use qa_core::workflow::WorkflowState;
use serde::Serialize;
use services::{ExportError, SessionError, TranscriptionError};
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    redirect: Option<WorkflowState>,
}

impl ApiError {
    /// Status code and the workflow state the client should navigate to.
    pub fn classify(&self) -> (StatusCode, Option<WorkflowState>) {
        match self {
            ApiError::Session(err) => classify_session(err),
            ApiError::Export(ExportError::Session(err)) => classify_session(err),
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            ApiError::Language(_) | ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
        }
    }
}

fn classify_session(err: &SessionError) -> (StatusCode, Option<WorkflowState>) {
    match err {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, Some(WorkflowState::AwaitingItems)),
        SessionError::OutOfRange { redirect, .. } => (StatusCode::CONFLICT, Some(*redirect)),
        SessionError::Completed => (StatusCode::CONFLICT, Some(WorkflowState::Complete)),
        SessionError::NotStarted => (StatusCode::CONFLICT, Some(WorkflowState::AwaitingItems)),
        SessionError::EmptyItemList
        | SessionError::Attempt(_)
        | SessionError::Item(_)
        | SessionError::Tester(_)
        | SessionError::ItemFile(_)
        | SessionError::Workflow(_) => (StatusCode::BAD_REQUEST, None),
        SessionError::AccessDenied(_) => (StatusCode::FORBIDDEN, None),
        SessionError::Transcription(TranscriptionError::Timeout(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, None)
        }
        SessionError::Transcription(_) => (StatusCode::BAD_GATEWAY, None),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, redirect) = self.classify();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
            redirect,
        };
        (status, Json(body)).into_response()
    }
}
