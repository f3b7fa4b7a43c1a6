use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use qa_core::model::SessionId;
use services::CsvExport;

use super::dto::ResultsResponse;
use super::error::ApiError;
use crate::AppState;

/// GET /api/sessions/:id/results
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let results = state.services.results().results(SessionId::new(id)).await?;
    Ok(Json(results.into()))
}

/// GET /api/sessions/:id/export.csv
pub async fn export_item_report(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let export = state
        .services
        .exports()
        .item_report(SessionId::new(id))
        .await?;
    Ok(csv_download(export))
}

/// GET /api/sessions/:id/attempts.csv
pub async fn export_attempt_log(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let export = state
        .services
        .exports()
        .attempt_log(SessionId::new(id))
        .await?;
    Ok(csv_download(export))
}

fn csv_download(export: CsvExport) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&export.file_name),
        ),
    ];
    (headers, export.body).into_response()
}

/// Header values must be ASCII, so non-ASCII names get an RFC 5987 `filename*`.
fn content_disposition(file_name: &str) -> String {
    if file_name.is_ascii() {
        return format!("attachment; filename=\"{file_name}\"");
    }
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names_are_quoted_as_is() {
        assert_eq!(
            content_disposition("asr_test_results_Asha_Rao_20231114_221320.csv"),
            "attachment; filename=\"asr_test_results_Asha_Rao_20231114_221320.csv\""
        );
    }

    #[test]
    fn non_ascii_names_get_encoded_variant() {
        let value = content_disposition("asr_test_results_आशा.csv");
        assert!(value.starts_with("attachment; filename=\"asr_test_results____.csv\"; "));
        assert!(value.ends_with("filename*=UTF-8''asr_test_results_%E0%A4%86%E0%A4%B6%E0%A4%BE.csv"));
        assert!(value.is_ascii());
    }
}
