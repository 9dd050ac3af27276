//! Map curl errors onto the probe error taxonomy.

use super::error::{ProbeError, TransportCause};

/// Classify a curl error returned by `perform()`.
///
/// URL and protocol rejections happen before anything is sent, so they are
/// reported as request build failures rather than transport failures.
pub(crate) fn classify_curl_error(e: &curl::Error) -> ProbeError {
    if e.is_url_malformed() || e.is_unsupported_protocol() {
        return ProbeError::RequestBuildFailed(e.to_string());
    }
    ProbeError::TransportFailed {
        cause: transport_cause(e),
        message: e.to_string(),
    }
}

fn transport_cause(e: &curl::Error) -> TransportCause {
    if e.is_operation_timedout() {
        return TransportCause::Timeout;
    }
    if e.is_aborted_by_callback() {
        return TransportCause::Cancelled;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransportCause::Connection;
    }
    if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cipher()
    {
        return TransportCause::Tls;
    }
    TransportCause::Other
}
