//! Aggregation and log reporting of a finished run.

use serde::{Serialize, Serializer};
use std::time::Duration;

use crate::probe::CheckOutcome;
use crate::scheduler::CheckResult;

/// Counters for one finished run. Computed once, after the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Tasks whose failure was caused by run cancellation (subset of `failed`).
    pub cancelled: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_results(results: &[CheckResult], elapsed: Duration) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        let cancelled = results
            .iter()
            .filter(|r| r.outcome.error().map_or(false, |e| e.was_cancelled()))
            .count();
        Self {
            total: results.len(),
            success,
            failed: results.len() - success,
            cancelled,
            elapsed,
        }
    }
}

fn duration_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Emit one log event for a result: info on 2xx, warn on any other status, error on failure.
pub fn log_result(result: &CheckResult) {
    let line_number = result.line_number();
    let url = result.url.as_str();
    match &result.outcome {
        CheckOutcome::Response {
            status_code,
            status_text,
        } if result.success => {
            tracing::info!(line_number, url, statuscode = status_code, status = %status_text, "http check completed");
        }
        CheckOutcome::Response {
            status_code,
            status_text,
        } => {
            tracing::warn!(line_number, url, statuscode = status_code, status = %status_text, "http check failed (bad status)");
        }
        CheckOutcome::Failed(err) => {
            tracing::error!(
                line_number,
                url,
                kind = err.kind(),
                timeout = err.was_timeout(),
                error = %err,
                "http check failed"
            );
        }
    }
}

/// Emit the closing summary event.
pub fn log_summary(summary: &RunSummary, timeout_secs: u64, concurrency: usize) {
    tracing::info!(
        total_urls = summary.total,
        timeout = timeout_secs,
        concurrency,
        success = summary.success,
        failed = summary.failed,
        cancelled = summary.cancelled,
        duration = ?summary.elapsed,
        "monitoring completed"
    );
}
