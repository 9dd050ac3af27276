//! Single-check probe: one cancellable HTTP GET reduced to a status or an error.
//!
//! Uses the curl crate (libcurl) with a fresh easy handle per check. Blocking;
//! the dispatcher runs each probe on its own worker thread.
//!
//! In-flight cancellation is seen through libcurl's progress callback. libcurl
//! calls it many times per second while data moves but only about once per
//! second on an idle connection, so a cancelled or expired token can take up to
//! roughly one second to abort a probe that is waiting on a silent server.

mod classify;
mod error;
mod parse;

pub use error::{ProbeError, TransportCause};

use serde::Serialize;
use std::str;
use std::time::Duration;

use crate::config::UrlmonConfig;
use crate::control::CancelToken;
use crate::url_model::{normalize, NormalizedUrl};

/// Outcome of one check: either an HTTP response was received or it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Any received response, 2xx or not.
    Response { status_code: u16, status_text: String },
    Failed(ProbeError),
}

impl CheckOutcome {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CheckOutcome::Response { status_code, .. } => Some(*status_code),
            CheckOutcome::Failed(_) => None,
        }
    }

    pub fn status_text(&self) -> Option<&str> {
        match self {
            CheckOutcome::Response { status_text, .. } => Some(status_text),
            CheckOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            CheckOutcome::Response { .. } => None,
            CheckOutcome::Failed(e) => Some(e),
        }
    }

    /// True iff a response arrived with a status in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code(), Some(200..=299))
    }
}

/// Something that can check one raw URL. The dispatcher is generic over this
/// so tests can substitute instrumented probes.
pub trait Probe: Sync {
    fn check(&self, cancel: &CancelToken, raw_url: &str) -> CheckOutcome;
}

/// Transport settings for a probe. Built from config; no process-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Total time allowed for one request (connect, TLS, headers).
    pub timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub user_agent: Option<String>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self::from(&UrlmonConfig::default())
    }
}

impl From<&UrlmonConfig> for ProbeOptions {
    fn from(cfg: &UrlmonConfig) -> Self {
        Self {
            timeout: Duration::from_secs(cfg.timeout_secs),
            connect_timeout: cfg.connect_timeout_secs.map(Duration::from_secs),
            follow_redirects: cfg.follow_redirects,
            max_redirects: cfg.max_redirects,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Probe backed by libcurl.
#[derive(Debug, Clone, Default)]
pub struct CurlProbe {
    options: ProbeOptions,
}

impl CurlProbe {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    fn build_request(&self, url: &NormalizedUrl) -> Result<curl::easy::Easy, curl::Error> {
        let opts = &self.options;
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.get(true)?;
        // Several probes run on separate threads; libcurl must not use signals for timeouts.
        easy.signal(false)?;
        easy.follow_location(opts.follow_redirects)?;
        if opts.follow_redirects {
            easy.max_redirections(opts.max_redirects)?;
        }
        easy.timeout(opts.timeout)?;
        if let Some(connect) = opts.connect_timeout {
            easy.connect_timeout(connect)?;
        }
        if let Some(agent) = &opts.user_agent {
            easy.useragent(agent)?;
        }
        // Needed for the progress callback, which is how cancellation reaches libcurl.
        easy.progress(true)?;
        Ok(easy)
    }
}

impl Probe for CurlProbe {
    fn check(&self, cancel: &CancelToken, raw_url: &str) -> CheckOutcome {
        let url = match normalize(raw_url) {
            Ok(url) => url,
            Err(e) => return CheckOutcome::Failed(e.into()),
        };
        if cancel.is_cancelled() {
            return CheckOutcome::Failed(ProbeError::Cancelled);
        }
        let mut easy = match self.build_request(&url) {
            Ok(easy) => easy,
            Err(e) => return CheckOutcome::Failed(ProbeError::RequestBuildFailed(e.to_string())),
        };
        match perform(&mut easy, cancel) {
            Ok((status_code, status_text)) => CheckOutcome::Response {
                status_code,
                status_text,
            },
            Err(e) => CheckOutcome::Failed(e),
        }
        // `easy` drops here on every path, closing the connection.
    }
}

/// Run the transfer until the response headers are in. The body is never read:
/// the first body chunk aborts the transfer.
fn perform(easy: &mut curl::easy::Easy, cancel: &CancelToken) -> Result<(u16, String), ProbeError> {
    let mut status_line: Option<String> = None;
    let mut body_cut = false;

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    if parse::is_status_line(line) {
                        // Last one wins: redirects and interim responses come first.
                        status_line = Some(line.trim_end().to_string());
                    }
                }
                true
            })
            .map_err(build_failed)?;
        transfer
            .write_function(|_data| {
                body_cut = true;
                Ok(0)
            })
            .map_err(build_failed)?;
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(build_failed)?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if !(body_cut && e.is_write_error()) {
            return Err(classify::classify_curl_error(&e));
        }
    }

    let code = easy.response_code().map_err(|e| ProbeError::TransportFailed {
        cause: TransportCause::Other,
        message: e.to_string(),
    })?;
    let status_code = match u16::try_from(code) {
        Ok(c) if c > 0 => c,
        _ => {
            return Err(ProbeError::TransportFailed {
                cause: TransportCause::Other,
                message: format!("no valid HTTP status received (code {})", code),
            })
        }
    };
    let status_text = status_line
        .as_deref()
        .and_then(parse::status_text)
        .unwrap_or_else(|| status_code.to_string());
    Ok((status_code, status_text))
}

fn build_failed(e: curl::Error) -> ProbeError {
    ProbeError::RequestBuildFailed(e.to_string())
}
