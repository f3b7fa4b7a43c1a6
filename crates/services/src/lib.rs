#![forbid(unsafe_code)]

pub mod access;
pub mod app_services;
pub mod error;
pub mod export;
pub mod items;
pub mod sessions;
pub mod transcription;

pub use qa_core::Clock;

pub use access::AccessPolicy;
pub use app_services::{AppServices, ServiceSettings};
pub use error::{
    AppServicesError, ExportError, ItemSourceError, SessionError, TranscriptionConfigError,
    TranscriptionError,
};
pub use export::{CsvExport, ExportService};
pub use items::ItemSource;
pub use sessions::{
    AttemptOutcome, ItemReport, NextSlot, ResultsService, SessionProgress, SessionResults,
    TestRunService,
};
pub use transcription::{SarvamTranscriber, Transcriber, TranscriptionConfig};
