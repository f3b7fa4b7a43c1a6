//! HTTP tests driving the router against in-memory storage.

use std::sync::Arc;

use app::{AppState, build_router};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use qa_core::model::Language;
use qa_core::time::fixed_clock;
use serde_json::Value;
use services::{AccessPolicy, AppServices, ServiceSettings, Transcriber, TranscriptionError};
use storage::repository::Storage;
use tower::util::ServiceExt;

/// Echoes the audio bytes back as the transcript; `fail` reports no transcript.
struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        _mime_type: &str,
        _language: Language,
    ) -> Result<String, TranscriptionError> {
        match audio {
            b"fail" => Err(TranscriptionError::MissingTranscript),
            other => Ok(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

fn setup_app_with(settings: ServiceSettings) -> Router {
    let services = AppServices::with_storage(
        Storage::in_memory(),
        fixed_clock(),
        settings,
        Arc::new(EchoTranscriber),
    );
    build_router(AppState::new(services))
}

fn setup_app() -> Router {
    setup_app_with(ServiceSettings::default())
}

fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

fn audio(uri: &str, text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "audio/webm")
        .body(Body::from(text.to_owned()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

const START_ENGLISH: &str =
    "/api/sessions?tester_name=Asha%20Rao&tester_email=asha@example.com&language=english";

async fn start(app: &Router, csv: &str) -> u64 {
    let (status, body) = send(app, request("POST", START_ENGLISH, csv.to_owned())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["session"]["id"].as_u64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app();
    let (status, body) = send(&app, request("GET", "/health", Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["transcription_enabled"], true);
}

#[tokio::test]
async fn languages_list_codes_and_defaults() {
    let app = setup_app();
    let (status, body) = send(&app, request("GET", "/api/languages", Body::empty())).await;
    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 6);
    let odia = entries.iter().find(|e| e["name"] == "odia").unwrap();
    assert_eq!(odia["code"], "or-IN");
    assert_eq!(odia["has_default_items"], false);
    let hindi = entries.iter().find(|e| e["name"] == "hindi").unwrap();
    assert_eq!(hindi["has_default_items"], true);
}

#[tokio::test]
async fn start_with_upload_presents_first_slot() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        request("POST", START_ENGLISH, "Okra,green\nCarrot\n\nOkra\n"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["items"], serde_json::json!(["Okra", "Carrot"]));
    assert_eq!(body["session"]["state"]["stage"], "in_progress");
    assert_eq!(body["session"]["language"], "english");
    assert_eq!(body["next"]["keyword"], "Okra");
    assert_eq!(body["next"]["attempt"], 1);
    assert_eq!(body["total_items"], 2);
}

#[tokio::test]
async fn start_without_body_uses_default_list() {
    let app = setup_app();
    let (status, body) = send(&app, request("POST", START_ENGLISH, Body::empty())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_items"], 18);
    assert_eq!(body["next"]["keyword"], "Ash Gourd");
}

#[tokio::test]
async fn start_rejects_bad_input() {
    let app = setup_app();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/sessions?tester_name=A&tester_email=a@example.com&language=klingon",
            Body::empty(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["redirect"].is_null());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/sessions?tester_name=A&tester_email=nope&language=hindi",
            Body::empty(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/sessions?tester_name=A&tester_email=a@example.com&language=odia",
            Body::empty(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no usable items in the supplied list");
}

#[tokio::test]
async fn access_policy_rejects_other_domains() {
    let app = setup_app_with(ServiceSettings {
        access: AccessPolicy::with_domains(["farm.example"]),
        ..ServiceSettings::default()
    });
    let (status, _) = send(&app, request("POST", START_ENGLISH, Body::empty())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_session_redirects_to_start() {
    let app = setup_app();
    let (status, body) = send(&app, request("GET", "/api/sessions/404", Body::empty())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["redirect"]["stage"], "awaiting_items");
}

#[tokio::test]
async fn recorded_attempts_flow_into_results_and_export() {
    let app = setup_app();
    let id = start(&app, "Okra\nCarrot\n").await;
    let slot = |n: u8| format!("/api/sessions/{id}/items/0/attempts/{n}");

    let (status, body) = send(&app, audio(&slot(1), "this is okra")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attempt"]["matched"], true);
    assert_eq!(body["advanced"], true);
    assert_eq!(body["progress"]["next"]["attempt"], 2);

    send(&app, audio(&slot(2), "okay")).await;
    send(&app, audio(&slot(3), "Okra!")).await;

    let (status, body) = send(
        &app,
        request("POST", &format!("/api/sessions/{id}/end"), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["state"]["stage"], "complete");

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/sessions/{id}/results"), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let okra = &body["items"][0];
    assert_eq!(okra["ratio"], "2/3");
    assert_eq!(okra["bucket"], "moderate");
    assert_eq!(okra["slots"][1]["transcript"], "okay");
    assert!(okra["slots"][3].is_null());
    assert_eq!(body["items"][1]["bucket"], "poor");
    assert_eq!(body["buckets"]["moderate"], 1);
    assert_eq!(body["buckets"]["poor"], 1);
    assert_eq!(body["accuracy_percent"], 67);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/sessions/{id}/export.csv"),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_owned();
    assert!(disposition.starts_with("attachment; filename=\"asr_test_results_Asha_Rao_"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Asha Rao,Okra,english,2/3,this is okra,true,okay,false,Okra!,true"));
    assert!(lines[2].starts_with("Asha Rao,Carrot,english,0/0,,false"));
}

#[tokio::test]
async fn attempt_log_download_lists_recorded_attempts() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;
    send(&app, audio(&format!("/api/sessions/{id}/items/0/attempts/1"), "okra")).await;

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/sessions/{id}/attempts.csv"),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn future_slot_and_exhausted_items_conflict_with_redirect() {
    let app = setup_app();
    let id = start(&app, "Okra\nCarrot\n").await;

    let (status, body) = send(
        &app,
        audio(&format!("/api/sessions/{id}/items/1/attempts/1"), "carrot"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["redirect"]["stage"], "in_progress");
    assert_eq!(body["redirect"]["item_index"], 0);
    assert_eq!(body["redirect"]["attempt"], 1);

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/sessions/{id}/items/2"), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["redirect"]["stage"], "complete");

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/sessions/{id}/items/0"), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next"]["keyword"], "Okra");
}

#[tokio::test]
async fn attempt_number_outside_budget_is_bad_request() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;
    let (status, _) = send(
        &app,
        audio(&format!("/api/sessions/{id}/items/0/attempts/6"), "okra"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_audio_is_bad_request() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;
    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/sessions/{id}/items/0/attempts/1"),
            Body::empty(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_content_type_is_bad_request() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{id}/items/0/attempts/1"))
        .header(header::CONTENT_TYPE, "not a mime type")
        .body(Body::from("okra"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Content-Type"));

    let (_, body) = send(
        &app,
        request("GET", &format!("/api/sessions/{id}"), Body::empty()),
    )
    .await;
    assert_eq!(body["next"]["attempt"], 1);
}

#[tokio::test]
async fn transcription_failure_is_bad_gateway_and_records_nothing() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;

    let (status, body) = send(
        &app,
        audio(&format!("/api/sessions/{id}/items/0/attempts/1"), "fail"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());

    let (_, body) = send(
        &app,
        request("GET", &format!("/api/sessions/{id}"), Body::empty()),
    )
    .await;
    assert_eq!(body["next"]["attempt"], 1);
}

#[tokio::test]
async fn skip_then_finished_session_rejects_more_attempts() {
    let app = setup_app();
    let id = start(&app, "Okra\n").await;

    for _ in 0..5 {
        let (status, _) = send(
            &app,
            request("POST", &format!("/api/sessions/{id}/skip"), Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        audio(&format!("/api/sessions/{id}/items/0/attempts/1"), "okra"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["redirect"]["stage"], "complete");

    let (status, body) = send(
        &app,
        request("POST", &format!("/api/sessions/{id}/end"), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn listing_returns_newest_first() {
    let app = setup_app();
    let first = start(&app, "Okra\n").await;
    let second = start(&app, "Carrot\n").await;

    let (status, body) = send(
        &app,
        request("GET", "/api/sessions?limit=1", Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], second);
    assert_ne!(first, second);
}
