//! CSV exports of a finished (or abandoned) run.

use qa_core::model::{Attempt, AttemptNumber, SessionId, TestSession};

use crate::Clock;
use crate::error::ExportError;
use crate::sessions::{ResultsService, SessionResults};

/// A rendered CSV document and the file name to offer for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub body: String,
}

/// `asr_test_results_<tester>_<YYYYmmdd_HHMMSS>.csv`, non-alphanumerics as `_`.
#[must_use]
pub fn export_file_name(tester_name: &str, clock: &Clock) -> String {
    let tester: String = tester_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("asr_test_results_{tester}_{}.csv", clock.file_stamp())
}

fn matched_cell(matched: bool) -> &'static str {
    if matched { "true" } else { "false" }
}

/// One row per item, including items never attempted.
///
/// # Errors
///
/// Returns `ExportError` if the CSV writer fails.
pub fn item_report_csv(results: &SessionResults) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "Tester Name".to_owned(),
        "Crop Name".to_owned(),
        "Language".to_owned(),
        "Result".to_owned(),
    ];
    for number in AttemptNumber::all() {
        header.push(format!("Attempt {number} Transcript"));
        header.push(format!("Attempt {number} Matched"));
    }
    writer.write_record(&header)?;

    let session = &results.session;
    for item in &results.items {
        let mut row = vec![
            session.tester().name().to_owned(),
            item.keyword.clone(),
            session.language().name().to_owned(),
            item.ratio.clone(),
        ];
        for slot in &item.slots {
            match slot {
                Some(attempt) => {
                    row.push(attempt.transcript.clone());
                    row.push(matched_cell(attempt.matched).to_owned());
                }
                None => {
                    row.push(String::new());
                    row.push(matched_cell(false).to_owned());
                }
            }
        }
        writer.write_record(&row)?;
    }

    finish(writer)
}

/// One row per recorded attempt, in item then attempt order.
///
/// # Errors
///
/// Returns `ExportError` if the CSV writer fails.
pub fn attempt_log_csv(session: &TestSession, attempts: &[Attempt]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "tester_email",
        "language",
        "session_id",
        "crop_name",
        "attempt_number",
        "transcript",
        "matched",
        "recorded_at",
    ])?;

    let session_id = session.id().to_string();
    for attempt in attempts {
        writer.write_record([
            session.tester().email(),
            session.language().name(),
            session_id.as_str(),
            attempt.item.as_str(),
            attempt.number.to_string().as_str(),
            attempt.transcript.as_str(),
            matched_cell(attempt.matched),
            attempt.recorded_at.to_rfc3339().as_str(),
        ])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Loads a session's results and renders the CSV downloads.
#[derive(Clone)]
pub struct ExportService {
    clock: Clock,
    results: ResultsService,
}

impl ExportService {
    #[must_use]
    pub fn new(clock: Clock, results: ResultsService) -> Self {
        Self { clock, results }
    }

    /// Per-item report.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Session` for unknown sessions or storage failures.
    pub async fn item_report(&self, id: SessionId) -> Result<CsvExport, ExportError> {
        let results = self.results.results(id).await?;
        Ok(CsvExport {
            file_name: export_file_name(results.session.tester().name(), &self.clock),
            body: item_report_csv(&results)?,
        })
    }

    /// Raw attempt log.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Session` for unknown sessions or storage failures.
    pub async fn attempt_log(&self, id: SessionId) -> Result<CsvExport, ExportError> {
        let (session, attempts) = self.results.attempt_log(id).await?;
        let name = export_file_name(session.tester().name(), &self.clock);
        Ok(CsvExport {
            file_name: name.replacen("asr_test_results_", "asr_test_attempts_", 1),
            body: attempt_log_csv(&session, &attempts)?,
        })
    }
}
