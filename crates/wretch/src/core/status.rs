use http::StatusCode;

/// Returns `true` when a response counts as successful (`200..=299`).
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use wretch::is_ok;
///
/// assert!(is_ok(StatusCode::OK));
/// assert!(is_ok(StatusCode::NO_CONTENT));
/// assert!(!is_ok(StatusCode::NOT_MODIFIED));
/// assert!(!is_ok(StatusCode::NOT_FOUND));
/// ```
pub fn is_ok(status: StatusCode) -> bool {
    status.is_success()
}

/// Message carried by a status error.
pub fn error_message(status: StatusCode) -> String {
    format!("error code : {}", status.as_u16())
}
