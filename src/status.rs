//! HTTP status classification driving the dispatcher's retry decisions.

/// Status codes that are retried with exponential backoff.
pub const RETRY_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Outcome of classifying a response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    ClientError,
    ServerError,
}

/// Maps a numeric status code onto a [`StatusClass`].
///
/// The retryable set takes precedence over the generic 4xx/5xx ranges.
///
/// # Examples
///
/// ```
/// use mistral_client::status::{StatusClass, classify};
///
/// assert_eq!(classify(200), StatusClass::Success);
/// assert_eq!(classify(429), StatusClass::Retryable);
/// assert_eq!(classify(404), StatusClass::ClientError);
/// assert_eq!(classify(501), StatusClass::ServerError);
/// ```
pub fn classify(code: u16) -> StatusClass {
    if RETRY_STATUS_CODES.contains(&code) {
        StatusClass::Retryable
    } else if (400..500).contains(&code) {
        StatusClass::ClientError
    } else if code >= 500 {
        StatusClass::ServerError
    } else {
        StatusClass::Success
    }
}
