//! `urlmon check` – probe every URL in a file once.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use urlmon_core::config::UrlmonConfig;
use urlmon_core::control::CancelToken;
use urlmon_core::input;
use urlmon_core::probe::{CurlProbe, ProbeOptions};
use urlmon_core::report::{self, RunSummary};
use urlmon_core::scheduler::{CheckResult, Dispatcher, Task};

use crate::cli::interrupt;

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: RunSummary,
    results: &'a [CheckResult],
}

pub async fn run_check(
    cfg: &UrlmonConfig,
    file: &Path,
    run_timeout: Option<Duration>,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let targets = input::read_targets(file)?;

    tracing::info!(
        total_urls = targets.len(),
        timeout = cfg.timeout_secs,
        concurrency = cfg.concurrency,
        "monitoring started"
    );

    let cancel = match run_timeout {
        Some(t) => CancelToken::with_timeout(t),
        None => CancelToken::new(),
    };
    let watcher = interrupt::spawn_interrupt_watcher(cancel.clone());

    let dispatcher = Dispatcher::new(CurlProbe::new(ProbeOptions::from(cfg)), cfg.concurrency)?;
    let tasks = Task::from_targets(targets);
    let run_cancel = cancel.clone();
    let results = tokio::task::spawn_blocking(move || dispatcher.run_all(tasks, &run_cancel))
        .await
        .context("dispatcher task")??;
    watcher.abort();

    for result in &results {
        report::log_result(result);
    }
    let summary = RunSummary::from_results(&results, started.elapsed());
    if summary.cancelled > 0 {
        tracing::warn!(
            cancelled = summary.cancelled,
            "run cancelled before every check completed"
        );
    }
    report::log_summary(&summary, cfg.timeout_secs, cfg.concurrency);

    if json {
        let report = JsonReport {
            summary,
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
