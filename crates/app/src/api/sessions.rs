//! Session lifecycle endpoints: start, navigate, record, skip, end.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use qa_core::model::{Language, SessionId, Tester};
use serde::Deserialize;
use services::{SessionError, SessionProgress};
use tracing::debug;

use super::dto::{AttemptOutcomeResponse, ProgressResponse, SessionSummary};
use super::error::ApiError;
use crate::AppState;

pub const DEFAULT_AUDIO_MIME: &str = "audio/wav";
const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /api/sessions?limit=N
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let sessions = state.services.test_runs().list_sessions(limit).await?;
    Ok(Json(sessions.iter().map(SessionSummary::from).collect()))
}

/// Tester identity and language; missing fields fail validation as blanks.
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    #[serde(default)]
    pub tester_name: String,
    #[serde(default)]
    pub tester_email: String,
    #[serde(default)]
    pub language: String,
}

/// POST /api/sessions?tester_name=&tester_email=&language=
///
/// The body is the CSV item list; an empty body selects the language's
/// built-in list.
pub async fn start_session(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProgressResponse>), ApiError> {
    let language: Language = query.language.parse()?;
    let tester = Tester::new(query.tester_name, query.tester_email)
        .map_err(SessionError::from)?;
    let upload = (!body.is_empty()).then_some(body.as_ref());

    let session = state
        .services
        .test_runs()
        .start_session(tester, language, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(SessionProgress::of(session).into())))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state.services.test_runs().current(SessionId::new(id)).await?;
    Ok(Json(progress.into()))
}

/// GET /api/sessions/:id/items/:index
pub async fn locate_item(
    State(state): State<AppState>,
    Path((id, index)): Path<(u64, usize)>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state
        .services
        .test_runs()
        .locate(SessionId::new(id), index)
        .await?;
    Ok(Json(progress.into()))
}

/// POST /api/sessions/:id/items/:index/attempts/:number
///
/// The body is the recorded audio; a well-formed `Content-Type` is forwarded
/// to the transcriber.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path((id, index, number)): Path<(u64, usize, u8)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AttemptOutcomeResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("audio body is empty".into()));
    }
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_AUDIO_MIME);
    if mime_type.parse::<mime::Mime>().is_err() {
        return Err(ApiError::BadRequest(format!(
            "invalid Content-Type: {mime_type}"
        )));
    }
    debug!(
        session_id = id,
        item_index = index,
        attempt = number,
        bytes = body.len(),
        mime_type,
        "audio received"
    );

    let outcome = state
        .services
        .test_runs()
        .submit_attempt(SessionId::new(id), index, number, &body, mime_type)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /api/sessions/:id/skip
pub async fn skip_attempt(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state
        .services
        .test_runs()
        .skip_attempt(SessionId::new(id))
        .await?;
    Ok(Json(progress.into()))
}

/// POST /api/sessions/:id/end
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state
        .services
        .test_runs()
        .end_session(SessionId::new(id))
        .await?;
    Ok(Json(progress.into()))
}
