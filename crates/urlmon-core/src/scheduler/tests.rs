//! Dispatcher tests with instrumented in-memory probes.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use std::time::{Duration, Instant};

use super::*;
use crate::control::CancelToken;
use crate::probe::{CheckOutcome, Probe, ProbeError, TransportCause};

fn ok(status_code: u16) -> CheckOutcome {
    CheckOutcome::Response {
        status_code,
        status_text: status_code.to_string(),
    }
}

/// Sleeps, tracks how many checks overlap, and answers from the URL:
/// `fail*` -> connection error, `bad*` -> 500, anything else -> 200.
#[derive(Debug, Default)]
struct CountingProbe {
    delay: Duration,
    current: AtomicUsize,
    max_seen: AtomicUsize,
    calls: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl CountingProbe {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl Probe for CountingProbe {
    fn check(&self, _cancel: &CancelToken, raw_url: &str) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(raw_url.to_string());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        if raw_url.starts_with("fail") {
            CheckOutcome::Failed(ProbeError::TransportFailed {
                cause: TransportCause::Connection,
                message: "refused".into(),
            })
        } else if raw_url.starts_with("bad") {
            ok(500)
        } else {
            ok(200)
        }
    }
}

/// Blocks until the run is cancelled, like a request to a server that never answers.
struct HangingProbe;

impl Probe for HangingProbe {
    fn check(&self, cancel: &CancelToken, _raw_url: &str) -> CheckOutcome {
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        CheckOutcome::Failed(ProbeError::TransportFailed {
            cause: TransportCause::Cancelled,
            message: "aborted".into(),
        })
    }
}

struct PanickingProbe;

impl Probe for PanickingProbe {
    fn check(&self, _cancel: &CancelToken, raw_url: &str) -> CheckOutcome {
        if raw_url == "boom" {
            panic!("probe blew up");
        }
        ok(200)
    }
}

fn targets(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("host{}.example", i)).collect()
}

#[test]
fn every_task_gets_exactly_one_result_in_order() {
    for (n, c) in [(0, 1), (1, 1), (3, 8), (10, 3), (25, 1), (25, 25)] {
        let dispatcher = Dispatcher::new(CountingProbe::default(), c).unwrap();
        let results = dispatcher
            .run_all(Task::from_targets(targets(n)), &CancelToken::new())
            .unwrap();
        assert_eq!(results.len(), n, "n={} c={}", n, c);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.index, i);
            assert_eq!(r.url, format!("host{}.example", i));
        }
        assert_eq!(dispatcher.probe().calls.load(Ordering::SeqCst), n);
    }
}

#[test]
fn in_flight_never_exceeds_concurrency() {
    let dispatcher = Dispatcher::new(CountingProbe::with_delay(Duration::from_millis(20)), 4).unwrap();
    let results = dispatcher
        .run_all(Task::from_targets(targets(20)), &CancelToken::new())
        .unwrap();
    assert_eq!(results.len(), 20);
    let max_seen = dispatcher.probe().max_seen.load(Ordering::SeqCst);
    assert!(max_seen <= 4, "probe saw {} concurrent checks", max_seen);
    assert!(dispatcher.peak_in_flight() <= 4);
    assert!(dispatcher.peak_in_flight() >= 2, "work should overlap");
}

#[test]
fn concurrency_one_admits_in_input_order() {
    let dispatcher = Dispatcher::new(CountingProbe::with_delay(Duration::from_millis(2)), 1).unwrap();
    dispatcher
        .run_all(Task::from_targets(targets(8)), &CancelToken::new())
        .unwrap();
    let started = dispatcher.probe().started.lock().unwrap().clone();
    assert_eq!(started, targets(8));
}

#[test]
fn failures_do_not_abort_siblings() {
    let input = ["ok1.example", "fail.example", "bad.example", "ok2.example"];
    let dispatcher = Dispatcher::new(CountingProbe::default(), 2).unwrap();
    let results = dispatcher
        .run_all(Task::from_targets(input), &CancelToken::new())
        .unwrap();
    let success: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(success, vec![true, false, false, true]);
    assert!(results[1].outcome.error().is_some());
    assert_eq!(results[2].outcome.status_code(), Some(500));
    assert!(results[2].outcome.error().is_none());
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = Dispatcher::new(CountingProbe::default(), 0).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidConcurrency(0)));
    assert!(matches!(
        Dispatcher::new(HangingProbe, 0),
        Err(DispatchError::InvalidConcurrency(0))
    ));
}

#[test]
fn cancelled_before_start_marks_everything_cancelled() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let dispatcher = Dispatcher::new(CountingProbe::default(), 3).unwrap();
    let results = dispatcher.run_all(Task::from_targets(targets(5)), &cancel).unwrap();
    assert_eq!(results.len(), 5);
    assert!(results
        .iter()
        .all(|r| r.outcome == CheckOutcome::Failed(ProbeError::Cancelled)));
    assert_eq!(dispatcher.probe().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn cancel_mid_run_returns_promptly_with_all_results() {
    let cancel = CancelToken::new();
    let dispatcher = Dispatcher::new(HangingProbe, 2).unwrap();
    let started = Instant::now();
    let results = std::thread::scope(|s| {
        let run = s.spawn(|| dispatcher.run_all(Task::from_targets(targets(6)), &cancel));
        std::thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        run.join().unwrap().unwrap()
    });
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 6);
    // Two were in flight and aborted; the rest were never admitted.
    let inflight = results
        .iter()
        .filter(|r| matches!(r.outcome.error(), Some(e) if e.was_timeout()))
        .count();
    let never_started = results
        .iter()
        .filter(|r| r.outcome == CheckOutcome::Failed(ProbeError::Cancelled))
        .count();
    assert_eq!(inflight, 2);
    assert_eq!(never_started, 4);
    assert!(results.iter().all(|r| r.outcome.error().map_or(false, ProbeError::was_cancelled)));
}

#[test]
fn deadline_token_bounds_the_run() {
    let cancel = CancelToken::with_timeout(Duration::from_millis(40));
    let dispatcher = Dispatcher::new(HangingProbe, 3).unwrap();
    let started = Instant::now();
    let results = dispatcher.run_all(Task::from_targets(targets(4)), &cancel).unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| !r.success));
    // Cancelling again after the run is harmless.
    cancel.cancel();
    cancel.cancel();
}

#[test]
fn panicking_worker_still_yields_a_result() {
    let dispatcher = Dispatcher::new(PanickingProbe, 2).unwrap();
    let results = dispatcher
        .run_all(Task::from_targets(["a.example", "boom", "c.example"]), &CancelToken::new())
        .unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(matches!(
        results[1].outcome,
        CheckOutcome::Failed(ProbeError::WorkerFailed(_))
    ));
    assert_eq!(results[1].url, "boom");
    assert!(results[2].success);
    assert!(dispatcher.peak_in_flight() <= 2);
}

#[test]
fn repeated_runs_classify_identically() {
    let input = ["a.example", "fail.example", "bad.example", "b.example", "fail2"];
    let dispatcher = Dispatcher::new(CountingProbe::with_delay(Duration::from_millis(1)), 3).unwrap();
    let first = dispatcher
        .run_all(Task::from_targets(input), &CancelToken::new())
        .unwrap();
    let second = dispatcher
        .run_all(Task::from_targets(input), &CancelToken::new())
        .unwrap();
    let classify = |rs: &[CheckResult]| rs.iter().map(|r| (r.index, r.success)).collect::<Vec<_>>();
    assert_eq!(classify(&first), classify(&second));
    let indices: HashSet<usize> = first.iter().map(|r| r.index).collect();
    assert_eq!(indices.len(), input.len());
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn admission_is_logged_per_task() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();

    let dispatcher = Dispatcher::new(CountingProbe::default(), 2).unwrap();
    let results = tracing::subscriber::with_default(subscriber, || {
        dispatcher
            .run_all(Task::from_targets(targets(3)), &CancelToken::new())
            .unwrap()
    });
    assert_eq!(results.len(), 3);

    let out = logs.contents();
    assert_eq!(out.matches("task admitted").count(), 3, "{}", out);
    assert!(!out.contains("not admitted"), "{}", out);
}

#[test]
fn cancelled_tasks_are_logged_as_not_admitted() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();

    let cancel = CancelToken::new();
    cancel.cancel();
    let dispatcher = Dispatcher::new(CountingProbe::default(), 2).unwrap();
    tracing::subscriber::with_default(subscriber, || {
        dispatcher
            .run_all(Task::from_targets(targets(2)), &cancel)
            .unwrap()
    });

    let out = logs.contents();
    assert_eq!(out.matches("not admitted").count(), 2, "{}", out);
    assert!(!out.contains("task admitted"), "{}", out);
}
