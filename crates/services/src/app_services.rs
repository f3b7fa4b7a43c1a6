use std::sync::Arc;
use std::time::Duration;

use qa_core::model::RatioConvention;
use storage::repository::Storage;

use crate::Clock;
use crate::access::AccessPolicy;
use crate::error::AppServicesError;
use crate::export::ExportService;
use crate::sessions::{DEFAULT_TRANSCRIPTION_TIMEOUT, ResultsService, TestRunService};
use crate::transcription::{SarvamTranscriber, Transcriber};

/// Deployment-level knobs for the test-run services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub ratio_convention: RatioConvention,
    pub transcription_timeout: Duration,
    pub access: AccessPolicy,
    pub shuffle_items: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            ratio_convention: RatioConvention::default(),
            transcription_timeout: DEFAULT_TRANSCRIPTION_TIMEOUT,
            access: AccessPolicy::allow_all(),
            shuffle_items: false,
        }
    }
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    test_runs: Arc<TestRunService>,
    results: Arc<ResultsService>,
    exports: Arc<ExportService>,
    transcription_enabled: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP transcriber.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// transcription settings are malformed.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ServiceSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let transcriber = SarvamTranscriber::from_env()?;
        let enabled = transcriber.enabled();
        Ok(Self::with_storage(storage, clock, settings, Arc::new(transcriber)).enabled(enabled))
    }

    /// Build services backed by in-memory storage and the HTTP transcriber.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the transcription settings are malformed.
    pub fn new_in_memory(clock: Clock, settings: ServiceSettings) -> Result<Self, AppServicesError> {
        let transcriber = SarvamTranscriber::from_env()?;
        let enabled = transcriber.enabled();
        Ok(
            Self::with_storage(Storage::in_memory(), clock, settings, Arc::new(transcriber))
                .enabled(enabled),
        )
    }

    /// Build services from explicit parts.
    #[must_use]
    pub fn with_storage(
        storage: Storage,
        clock: Clock,
        settings: ServiceSettings,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let test_runs = TestRunService::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.attempts),
            transcriber,
        )
        .with_access_policy(settings.access)
        .with_shuffle_items(settings.shuffle_items)
        .with_transcription_timeout(settings.transcription_timeout);
        let results = ResultsService::new(
            settings.ratio_convention,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.attempts),
        );
        let exports = ExportService::new(clock, results.clone());

        Self {
            test_runs: Arc::new(test_runs),
            results: Arc::new(results),
            exports: Arc::new(exports),
            transcription_enabled: true,
        }
    }

    fn enabled(mut self, transcription_enabled: bool) -> Self {
        self.transcription_enabled = transcription_enabled;
        self
    }

    #[must_use]
    pub fn test_runs(&self) -> Arc<TestRunService> {
        Arc::clone(&self.test_runs)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn exports(&self) -> Arc<ExportService> {
        Arc::clone(&self.exports)
    }

    #[must_use]
    pub fn transcription_enabled(&self) -> bool {
        self.transcription_enabled
    }
}
