//! Tasks (one per input line) and the result recorded for each.

use serde::Serialize;

use crate::probe::CheckOutcome;

/// One unit of work: an input URL tagged with its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    index: usize,
    url: String,
}

impl Task {
    /// Build tasks from input lines, indexed `0..n` in input order.
    pub fn from_targets<I, S>(targets: I) -> Vec<Task>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        targets
            .into_iter()
            .enumerate()
            .map(|(index, url)| Task {
                index,
                url: url.into(),
            })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw URL exactly as it was read.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Final outcome for one task. Written once, by the worker that ran the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub index: usize,
    pub url: String,
    pub outcome: CheckOutcome,
    /// No error and a 2xx status.
    pub success: bool,
}

impl CheckResult {
    pub(crate) fn new(task: Task, outcome: CheckOutcome) -> Self {
        Self::from_parts(task.index, task.url, outcome)
    }

    pub(crate) fn from_parts(index: usize, url: String, outcome: CheckOutcome) -> Self {
        let success = outcome.is_success();
        Self {
            index,
            url,
            outcome,
            success,
        }
    }

    /// 1-based line number in the filtered input, as shown in logs.
    pub fn line_number(&self) -> usize {
        self.index + 1
    }
}
