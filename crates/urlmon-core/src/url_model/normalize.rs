//! Validate and canonicalize a raw URL candidate.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Scheme prepended when the input carries none.
const DEFAULT_SCHEME_PREFIX: &str = "https://";

/// Why a raw input line could not become a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeError {
    #[error("empty URL")]
    EmptyInput,
    #[error("malformed URL {input:?}: {reason}")]
    MalformedUrl { input: String, reason: String },
}

/// A validated URL that always starts with `http://` or `https://`.
///
/// The scheme prefix is always lowercase; the rest keeps the caller's spelling.
/// `url::Url` is only used for validation so no trailing slash is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const HTTP_PREFIXES: [&str; 2] = ["http://", "https://"];

/// The lowercase scheme prefix `s` starts with (in any ASCII case) and the remainder.
fn split_http_scheme(s: &str) -> Option<(&'static str, &str)> {
    HTTP_PREFIXES.iter().find_map(|prefix| {
        let head = s.get(..prefix.len())?;
        if head.eq_ignore_ascii_case(prefix) {
            Some((*prefix, &s[prefix.len()..]))
        } else {
            None
        }
    })
}

/// Trims `raw`, prepends `https://` when no http(s) scheme is present (lowercasing
/// one that is, so `HTTP://x` becomes `http://x`) and checks
/// that the result parses as a URL with a host.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let candidate = match split_http_scheme(trimmed) {
        Some((prefix, rest)) => format!("{}{}", prefix, rest),
        None => format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed),
    };

    let parsed = Url::parse(&candidate).map_err(|e| NormalizeError::MalformedUrl {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(NormalizeError::MalformedUrl {
            input: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(NormalizedUrl(candidate))
}
