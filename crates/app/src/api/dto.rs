//! JSON shapes returned by the API.

use chrono::{DateTime, Utc};
use qa_core::model::{Attempt, Language, QualityBucket, TestSession};
use qa_core::workflow::WorkflowState;
use serde::Serialize;
use services::{AttemptOutcome, ItemReport, SessionProgress, SessionResults};

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: u64,
    pub tester_name: String,
    pub tester_email: String,
    pub language: Language,
    pub state: WorkflowState,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&TestSession> for SessionSummary {
    fn from(session: &TestSession) -> Self {
        Self {
            id: session.id().value(),
            tester_name: session.tester().name().to_owned(),
            tester_email: session.tester().email().to_owned(),
            language: session.language(),
            state: session.state(),
            item_count: session.items().len(),
            created_at: session.created_at(),
            completed_at: session.completed_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NextSlotResponse {
    pub item_index: usize,
    pub keyword: String,
    pub attempt: u8,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub session: SessionSummary,
    pub items: Vec<String>,
    pub next: Option<NextSlotResponse>,
    pub total_items: usize,
    pub items_done: usize,
}

impl From<SessionProgress> for ProgressResponse {
    fn from(progress: SessionProgress) -> Self {
        Self {
            session: SessionSummary::from(&progress.session),
            items: progress
                .session
                .items()
                .keywords()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            next: progress.next.map(|slot| NextSlotResponse {
                item_index: slot.item_index,
                keyword: slot.keyword,
                attempt: slot.attempt.value(),
            }),
            total_items: progress.total_items,
            items_done: progress.items_done,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub item: String,
    pub attempt: u8,
    pub transcript: String,
    pub matched: bool,
    pub recorded_at: DateTime<Utc>,
}

impl From<&Attempt> for AttemptResponse {
    fn from(attempt: &Attempt) -> Self {
        Self {
            item: attempt.item.clone(),
            attempt: attempt.number.value(),
            transcript: attempt.transcript.clone(),
            matched: attempt.matched,
            recorded_at: attempt.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptOutcomeResponse {
    pub attempt: AttemptResponse,
    pub advanced: bool,
    pub progress: ProgressResponse,
}

impl From<AttemptOutcome> for AttemptOutcomeResponse {
    fn from(outcome: AttemptOutcome) -> Self {
        Self {
            attempt: AttemptResponse::from(&outcome.attempt),
            advanced: outcome.advanced,
            progress: outcome.progress.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemReportResponse {
    pub position: usize,
    pub keyword: String,
    pub correct_count: u8,
    pub attempts_made: u8,
    pub ratio: String,
    pub bucket: QualityBucket,
    pub slots: Vec<Option<AttemptResponse>>,
}

impl From<&ItemReport> for ItemReportResponse {
    fn from(item: &ItemReport) -> Self {
        Self {
            position: item.position,
            keyword: item.keyword.clone(),
            correct_count: item.result.correct_count(),
            attempts_made: item.result.attempts_made(),
            ratio: item.ratio.clone(),
            bucket: item.result.bucket(),
            slots: item
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(AttemptResponse::from))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BucketResponse {
    pub well_pronounced: usize,
    pub moderate: usize,
    pub poor: usize,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub session: SessionSummary,
    pub ratio_convention: String,
    pub items: Vec<ItemReportResponse>,
    pub buckets: BucketResponse,
    pub total_attempts: usize,
    pub matched_attempts: usize,
    pub accuracy_percent: u32,
}

impl From<SessionResults> for ResultsResponse {
    fn from(results: SessionResults) -> Self {
        Self {
            session: SessionSummary::from(&results.session),
            ratio_convention: results.convention.to_string(),
            items: results.items.iter().map(ItemReportResponse::from).collect(),
            buckets: BucketResponse {
                well_pronounced: results.buckets.well_pronounced,
                moderate: results.buckets.moderate,
                poor: results.buckets.poor,
            },
            total_attempts: results.total_attempts,
            matched_attempts: results.matched_attempts,
            accuracy_percent: results.accuracy_percent,
        }
    }
}
