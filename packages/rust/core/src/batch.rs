//! Batch driver: refresh every record of the lead list, one at a time.

use std::time::Instant;

use tracing::{error, info, instrument};

use leadrefresh_shared::{InputRecord, RecordReport, RefreshError};

use crate::pipeline::Pipeline;

/// Counts reported once the whole list has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records in the list.
    pub total: usize,
    /// Records whose lead was found and processed (all groups attempted).
    pub updated: usize,
    /// Records with no matching lead.
    pub lead_not_found: usize,
    /// Records only planned (dry run).
    pub planned: usize,
    /// Records that failed before any update could be attempted.
    pub failed: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting batch status.
pub trait BatchReporter: Send + Sync {
    /// Called before a record is processed. `index` is 1-based.
    fn record_started(&self, index: usize, total: usize, url: &str);
    /// Called when a record was processed without error.
    fn record_succeeded(&self, index: usize, total: usize, url: &str, report: &RecordReport);
    /// Called when a record failed.
    fn record_failed(&self, index: usize, total: usize, url: &str, error: &RefreshError);
    /// Called once after the last record.
    fn done(&self, summary: &BatchSummary);
}

/// No-op reporter for headless/test usage.
pub struct SilentReporter;

impl BatchReporter for SilentReporter {
    fn record_started(&self, _index: usize, _total: usize, _url: &str) {}
    fn record_succeeded(&self, _index: usize, _total: usize, _url: &str, _report: &RecordReport) {}
    fn record_failed(&self, _index: usize, _total: usize, _url: &str, _error: &RefreshError) {}
    fn done(&self, _summary: &BatchSummary) {}
}

/// Process `records` in order. A failing record is reported and skipped;
/// it never stops the batch.
#[instrument(skip_all, fields(records = records.len(), dry_run = pipeline.is_dry_run()))]
pub async fn run_batch(
    records: &[InputRecord],
    pipeline: &Pipeline,
    reporter: &dyn BatchReporter,
) -> BatchSummary {
    let start = Instant::now();
    let total = records.len();
    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };

    info!(total, "starting batch");

    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        let url = record.company_profile_url.as_str();

        info!(index, total, url, "updating lead");
        reporter.record_started(index, total, url);

        match pipeline.process(url).await {
            Ok(report) => {
                match report {
                    RecordReport::Updated(_) => summary.updated += 1,
                    RecordReport::LeadNotFound => summary.lead_not_found += 1,
                    RecordReport::DryRun { .. } => summary.planned += 1,
                }
                info!(index, total, url, %report, "lead processed");
                reporter.record_succeeded(index, total, url, &report);
            }
            Err(e) => {
                summary.failed += 1;
                error!(index, total, url, error = %e, "could not update lead");
                reporter.record_failed(index, total, url, &e);
            }
        }
    }

    summary.elapsed = start.elapsed();

    info!(
        total = summary.total,
        updated = summary.updated,
        lead_not_found = summary.lead_not_found,
        planned = summary.planned,
        failed = summary.failed,
        elapsed_ms = summary.elapsed.as_millis(),
        "batch complete"
    );

    reporter.done(&summary);
    summary
}
