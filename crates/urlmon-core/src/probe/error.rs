//! Per-check error taxonomy. Every variant is captured into a task's result, never propagated.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::url_model::NormalizeError;

/// What went wrong at the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCause {
    /// Per-probe deadline elapsed (connect or transfer).
    Timeout,
    /// The run's cancellation signal aborted the request in flight.
    Cancelled,
    /// Connection refused/reset, DNS failure, empty reply.
    Connection,
    /// TLS handshake or certificate failure.
    Tls,
    Other,
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportCause::Timeout => "timeout",
            TransportCause::Cancelled => "cancelled",
            TransportCause::Connection => "connection",
            TransportCause::Tls => "tls",
            TransportCause::Other => "other",
        };
        f.write_str(s)
    }
}

/// Why a check produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeError {
    /// Normalization failed; no request was attempted.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] NormalizeError),
    /// The request could not be set up (rejected option or URL). Nothing was sent.
    #[error("request build failed: {0}")]
    RequestBuildFailed(String),
    #[error("transport failed ({cause}): {message}")]
    TransportFailed {
        cause: TransportCause,
        message: String,
    },
    /// The run was cancelled before this task's probe started.
    #[error("cancelled before the check started")]
    Cancelled,
    /// The worker running the probe panicked or could not be spawned.
    #[error("probe worker failed: {0}")]
    WorkerFailed(String),
}

impl ProbeError {
    /// True for transport timeouts and for requests aborted in flight by cancellation.
    pub fn was_timeout(&self) -> bool {
        matches!(
            self,
            ProbeError::TransportFailed {
                cause: TransportCause::Timeout | TransportCause::Cancelled,
                ..
            }
        )
    }

    /// True when the failure is due to run-level cancellation (before or during the request).
    pub fn was_cancelled(&self) -> bool {
        matches!(
            self,
            ProbeError::Cancelled
                | ProbeError::TransportFailed {
                    cause: TransportCause::Cancelled,
                    ..
                }
        )
    }

    /// Short stable name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::InvalidUrl(_) => "invalid_url",
            ProbeError::RequestBuildFailed(_) => "request_build_failed",
            ProbeError::TransportFailed { .. } => "transport_failed",
            ProbeError::Cancelled => "cancelled",
            ProbeError::WorkerFailed(_) => "worker_failed",
        }
    }
}
