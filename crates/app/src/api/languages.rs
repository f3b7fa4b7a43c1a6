use axum::Json;
use qa_core::model::Language;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LanguageEntry {
    pub name: &'static str,
    pub code: &'static str,
    /// Whether a built-in item list exists for runs without an upload.
    pub has_default_items: bool,
}

/// GET /api/languages
pub async fn list_languages() -> Json<Vec<LanguageEntry>> {
    let entries = Language::ALL
        .iter()
        .map(|&language| LanguageEntry {
            name: language.name(),
            code: language.bcp47_code(),
            has_default_items: services::items::default_keywords(language).is_some(),
        })
        .collect();
    Json(entries)
}
