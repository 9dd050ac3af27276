//! Parse the HTTP status line captured from the response headers.

/// Returns true for a status line such as `HTTP/1.1 200 OK` or `HTTP/2 404`.
pub(crate) fn is_status_line(line: &str) -> bool {
    line.starts_with("HTTP/")
}

/// Extract the status text (`"200 OK"`) from a status line.
///
/// Falls back to just the code when the server sends no reason phrase (HTTP/2 never does).
pub(crate) fn status_text(line: &str) -> Option<String> {
    let line = line.trim();
    if !is_status_line(line) {
        return None;
    }
    let (_version, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    let code = rest.split_whitespace().next()?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(rest.to_string())
}
