use std::collections::HashMap;

use thiserror::Error;

use crate::status::{StatusClass, classify};

/// Convenience alias used across the crate.
pub type Result<T, E = MistralError> = std::result::Result<T, E>;

/// Aggregates every failure mode exposed by the client.
///
/// Variants carry the status code, raw body and headers whenever an HTTP exchange
/// completed, so callers can decide whether to retry on their own or surface the
/// upstream message.
#[derive(Debug, Error)]
pub enum MistralError {
    /// Missing API key, or a call without a model when no default model applies.
    #[error("configuration error: {message}")]
    Configuration { message: String },
    /// The server could not be reached (DNS, refused connection, TLS handshake).
    #[error("connection error: {message}")]
    Connection { message: String },
    /// A retryable status persisted after the retry budget was spent.
    #[error("api status error (http_status={status}): {message}")]
    ApiStatus {
        message: String,
        status: u16,
        /// Raw response body returned with the last attempt.
        body: String,
        headers: HashMap<String, String>,
    },
    /// Non-retryable 4xx status, or an `object: "error"` payload.
    #[error("api error (http_status={status:?}): {message}")]
    Api {
        message: String,
        status: Option<u16>,
        body: String,
        headers: HashMap<String, String>,
    },
    /// Malformed JSON, or a payload that does not match the expected record.
    #[error("decode error: {message}")]
    Decode { message: String },
    /// Catch-all for non-retryable server errors, transport protocol failures and
    /// unexpected response shapes.
    #[error("{message}")]
    Unexpected { message: String },
}

impl MistralError {
    /// Creates a [`MistralError::Configuration`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mistral_client::error::MistralError;
    ///
    /// let err = MistralError::configuration("model must be provided");
    /// assert!(matches!(err, MistralError::Configuration { .. }));
    /// ```
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a [`MistralError::Connection`].
    pub fn connection<T: Into<String>>(message: T) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a [`MistralError::Decode`].
    pub fn decode<T: Into<String>>(message: T) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a [`MistralError::Unexpected`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mistral_client::error::MistralError;
    ///
    /// let err = MistralError::unexpected("Unexpected response: {}");
    /// assert_eq!(err.to_string(), "Unexpected response: {}");
    /// ```
    pub fn unexpected<T: Into<String>>(message: T) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns the HTTP status attached to the error, if the exchange completed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiStatus { status, .. } => Some(*status),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the attached status is one the dispatcher retries (429, 500, 502-504).
    ///
    /// An [`MistralError::ApiStatus`] error reports `true`: the request may succeed
    /// if sent again later.
    pub fn is_retryable(&self) -> bool {
        self.status()
            .is_some_and(|status| classify(status) == StatusClass::Retryable)
    }

    /// Returns the response headers attached to the error, if any.
    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::ApiStatus { headers, .. } | Self::Api { headers, .. } => Some(headers),
            _ => None,
        }
    }
}
