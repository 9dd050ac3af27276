//! Bounded dispatcher: run the probe for every task with at most C in flight.
//!
//! The calling thread admits tasks in input order, taking a gate permit for each
//! before spawning its worker. Each worker receives the permit and a `&mut` to
//! its own pre-allocated result slot, so slots are disjoint by construction and
//! need no lock. The scope is the join point: `run_all` returns once every
//! spawned worker has finished.

use std::collections::TryReserveError;
use std::thread;
use thiserror::Error;

use crate::control::CancelToken;
use crate::probe::{CheckOutcome, Probe, ProbeError};

use super::gate::AdmissionGate;
use super::task::{CheckResult, Task};

/// Reasons `run_all` can fail as a whole. Per-task failures never end up here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),
    #[error("cannot allocate results for {count} tasks")]
    Allocation {
        count: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Runs a `Probe` over a task list under a fixed concurrency limit.
#[derive(Debug)]
pub struct Dispatcher<P> {
    probe: P,
    gate: AdmissionGate,
}

impl<P: Probe> Dispatcher<P> {
    pub fn new(probe: P, concurrency: usize) -> Result<Self, DispatchError> {
        if concurrency == 0 {
            return Err(DispatchError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            probe,
            gate: AdmissionGate::new(concurrency),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.gate.capacity()
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Highest number of probes that were ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.gate.peak()
    }

    /// Check every task and return exactly one result per task, in input order.
    ///
    /// Tasks not yet admitted when `cancel` fires get `ProbeError::Cancelled`;
    /// probes already in flight observe the same token and return early.
    pub fn run_all(
        &self,
        tasks: Vec<Task>,
        cancel: &CancelToken,
    ) -> Result<Vec<CheckResult>, DispatchError> {
        let count = tasks.len();
        let mut slots: Vec<Option<CheckResult>> = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|source| DispatchError::Allocation { count, source })?;
        slots.resize_with(count, || None);

        tracing::debug!(
            tasks = count,
            concurrency = self.gate.capacity(),
            "dispatch started"
        );

        // Results for workers that died without writing their slot, by slot position.
        let mut orphans: Vec<(usize, CheckResult)> = Vec::new();

        thread::scope(|scope| {
            let mut workers: Vec<Worker<'_>> = Vec::with_capacity(count.min(self.gate.capacity()));

            for (position, (task, slot)) in tasks.into_iter().zip(slots.iter_mut()).enumerate() {
                let Some(permit) = self.gate.acquire(cancel) else {
                    tracing::debug!(index = task.index(), url = task.url(), "not admitted: run cancelled");
                    *slot = Some(CheckResult::new(
                        task,
                        CheckOutcome::Failed(ProbeError::Cancelled),
                    ));
                    continue;
                };

                let index = task.index();
                let url = task.url().to_string();
                tracing::debug!(index, url = %url, "task admitted");
                let probe = &self.probe;
                let spawned = thread::Builder::new()
                    .name(format!("urlmon-probe-{}", index))
                    .spawn_scoped(scope, move || {
                        let _permit = permit;
                        let outcome = probe.check(cancel, task.url());
                        tracing::debug!(index, url = task.url(), success = outcome.is_success(), "probe finished");
                        *slot = Some(CheckResult::new(task, outcome));
                    });

                match spawned {
                    Ok(handle) => workers.push(Worker {
                        position,
                        index,
                        url,
                        handle,
                    }),
                    Err(e) => {
                        tracing::error!(index, url = %url, "could not spawn probe worker: {}", e);
                        orphans.push(orphan(position, index, url, format!("spawn failed: {}", e)));
                    }
                }

                // Reap finished workers so the handle list stays near the concurrency limit.
                if workers.len() > self.gate.capacity() {
                    reap_finished(&mut workers, &mut orphans);
                }
            }

            for worker in workers {
                if let Some(o) = worker.join() {
                    orphans.push(o);
                }
            }
        });

        for (position, result) in orphans {
            if slots[position].is_none() {
                slots[position] = Some(result);
            }
        }

        let results: Vec<CheckResult> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), count, "every task must produce one result");
        tracing::debug!(
            results = results.len(),
            cancelled = cancel.is_cancelled(),
            "dispatch finished"
        );
        Ok(results)
    }
}

struct Worker<'scope> {
    position: usize,
    index: usize,
    url: String,
    handle: thread::ScopedJoinHandle<'scope, ()>,
}

impl Worker<'_> {
    /// Join the worker; a panic turns into a replacement result for its slot.
    fn join(self) -> Option<(usize, CheckResult)> {
        match self.handle.join() {
            Ok(()) => None,
            Err(_) => {
                tracing::error!(index = self.index, url = %self.url, "probe worker panicked");
                Some(orphan(
                    self.position,
                    self.index,
                    self.url,
                    "worker panicked".to_string(),
                ))
            }
        }
    }
}

fn orphan(position: usize, index: usize, url: String, reason: String) -> (usize, CheckResult) {
    (
        position,
        CheckResult::from_parts(index, url, CheckOutcome::Failed(ProbeError::WorkerFailed(reason))),
    )
}

fn reap_finished(workers: &mut Vec<Worker<'_>>, orphans: &mut Vec<(usize, CheckResult)>) {
    let mut i = 0;
    while i < workers.len() {
        if workers[i].handle.is_finished() {
            if let Some(o) = workers.swap_remove(i).join() {
                orphans.push(o);
            }
        } else {
            i += 1;
        }
    }
}
