use std::sync::Arc;

use qa_core::model::{
    Attempt, ItemResult, MAX_ATTEMPTS, RatioConvention, SessionId, TestSession,
};
use qa_core::scoring::{self, BucketCounts};
use storage::repository::{AttemptRepository, SessionRepository};

use super::queries::SessionQueries;
use crate::error::SessionError;

/// Per-item outcome with the five attempt slots in order.
///
/// Presentation-agnostic: slots keep the raw attempt, and only the ratio is
/// pre-rendered because its denominator depends on the deployment convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub position: usize,
    pub keyword: String,
    pub result: ItemResult,
    pub ratio: String,
    pub slots: [Option<Attempt>; MAX_ATTEMPTS as usize],
}

/// Results of one run: item reports in list order plus session totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResults {
    pub session: TestSession,
    pub convention: RatioConvention,
    pub items: Vec<ItemReport>,
    pub buckets: BucketCounts,
    pub total_attempts: usize,
    pub matched_attempts: usize,
    pub accuracy_percent: u32,
}

impl SessionResults {
    #[must_use]
    pub fn build(session: TestSession, attempts: &[Attempt], convention: RatioConvention) -> Self {
        let items: Vec<ItemReport> = session
            .items()
            .iter()
            .map(|item| {
                let own: Vec<Attempt> = attempts
                    .iter()
                    .filter(|a| a.item == item.keyword())
                    .cloned()
                    .collect();
                let result = scoring::aggregate(item.keyword(), &own);
                let mut slots: [Option<Attempt>; MAX_ATTEMPTS as usize] =
                    std::array::from_fn(|_| None);
                for attempt in own {
                    let index = attempt.number.index();
                    slots[index] = Some(attempt);
                }
                ItemReport {
                    position: item.position(),
                    keyword: item.keyword().to_owned(),
                    ratio: result.ratio(convention),
                    result,
                    slots,
                }
            })
            .collect();

        let buckets = BucketCounts::tally(items.iter().map(|r| &r.result));
        let total_attempts: usize = items
            .iter()
            .map(|r| usize::from(r.result.attempts_made()))
            .sum();
        let matched_attempts: usize = items
            .iter()
            .map(|r| usize::from(r.result.correct_count()))
            .sum();

        Self {
            session,
            convention,
            items,
            buckets,
            total_attempts,
            matched_attempts,
            accuracy_percent: accuracy_percent(matched_attempts, total_attempts),
        }
    }
}

fn accuracy_percent(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (matched * 100 + total / 2) / total;
    u32::try_from(rounded).unwrap_or(100)
}

/// Read-only facade for results and exports over the repositories.
#[derive(Clone)]
pub struct ResultsService {
    convention: RatioConvention,
    sessions: Arc<dyn SessionRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(
        convention: RatioConvention,
        sessions: Arc<dyn SessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            convention,
            sessions,
            attempts,
        }
    }

    #[must_use]
    pub fn convention(&self) -> RatioConvention {
        self.convention
    }

    /// Aggregate every item of a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for unknown sessions and
    /// `SessionError::Storage` on repository failures.
    pub async fn results(&self, id: SessionId) -> Result<SessionResults, SessionError> {
        let (session, attempts) =
            SessionQueries::load_with_attempts(id, self.sessions.as_ref(), self.attempts.as_ref())
                .await?;
        Ok(SessionResults::build(session, &attempts, self.convention))
    }

    /// Session plus its recorded attempts in item then attempt order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for unknown sessions and
    /// `SessionError::Storage` on repository failures.
    pub async fn attempt_log(
        &self,
        id: SessionId,
    ) -> Result<(TestSession, Vec<Attempt>), SessionError> {
        SessionQueries::load_with_attempts(id, self.sessions.as_ref(), self.attempts.as_ref())
            .await
    }
}
