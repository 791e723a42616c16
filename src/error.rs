//! Error types for REST calls and token acquisition.
//!
//! Every failure either surfaces as a typed absent result (see
//! [`NotFoundPolicy`](crate::NotFoundPolicy)) or as one of the variants below,
//! carrying the raw response or the inner cause so callers can decide what to
//! do next.

use crate::response::RawResponse;
use http::StatusCode;

/// Boxed error used for wrapped causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type of the crate.
///
/// # Examples
///
/// ```no_run
/// use restline::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("orders/17").await {
///     Ok(response) => println!("Result: {:?}", response.result),
///     Err(Error::Request { response, source }) => {
///         eprintln!("HTTP {}: {}", response.status, response.text());
///         if let Some(cause) = source {
///             eprintln!("  caused by: {}", cause);
///         }
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required option was missing or invalid when building the client.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A token provider was constructed with missing or empty credentials.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The token endpoint was unreachable, answered with a non-success status,
    /// or returned a body that could not be parsed.
    #[error("Failed to fetch token: {message}")]
    TokenFetch {
        /// What went wrong
        message: String,
        /// The underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// A token provider could not produce a token (for example the inbound
    /// request carries no `Authorization` header).
    #[error("Token provider error: {0}")]
    TokenProvider(String),

    /// The transport failed to send the request or read the response.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The per-send timeout elapsed.
    #[error("Request timed out")]
    Timeout,

    /// The caller cancelled the call.
    #[error("Request cancelled")]
    Cancelled,

    /// The server returned a non-success status, or the response body could
    /// not be deserialized.
    ///
    /// The full raw response is attached. `source` is set when the body failed
    /// to deserialize.
    #[error("{}", describe_request_error(.response, .source))]
    Request {
        /// The response as returned by the transport
        response: Box<RawResponse>,
        /// The decode error, if the status was a success
        #[source]
        source: Option<BoxError>,
    },

    /// The request body could not be serialized.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The operation is deliberately not implemented.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// An invalid URL was provided or built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn describe_request_error(response: &RawResponse, source: &Option<BoxError>) -> String {
    match source {
        Some(cause) => format!(
            "Failed to deserialize response (status {}): {}",
            response.status, cause
        ),
        None => format!("HTTP request error: {}", response.status),
    }
}

/// Statuses the default retry policy treats as transient.
const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
];

impl Error {
    /// Returns `true` if this error is potentially retryable.
    ///
    /// Transport failures, timeouts and responses with status 500, 502, 503,
    /// 504 or 429 are retryable. Everything else, including deserialization
    /// failures and caller cancellation, is not.
    ///
    /// # Examples
    ///
    /// ```
    /// use restline::{Error, RawResponse};
    /// use http::StatusCode;
    ///
    /// let err = Error::Request {
    ///     response: Box::new(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE)),
    ///     source: None,
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::Request {
    ///     response: Box::new(RawResponse::new(StatusCode::BAD_REQUEST)),
    ///     source: None,
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Timeout => true,
            Error::Request { response, source } => {
                source.is_none() && TRANSIENT_STATUSES.contains(&response.status)
            }
            Error::InvalidConfiguration(_)
            | Error::InvalidArgument(_)
            | Error::TokenFetch { .. }
            | Error::TokenProvider(_)
            | Error::Cancelled
            | Error::SerializationFailed(_)
            | Error::NotSupported(_)
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code of the attached response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }

    /// Returns the raw response attached to a [`Error::Request`].
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Error::Request { response, .. } => Some(response),
            _ => None,
        }
    }

    pub(crate) fn token_fetch(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::TokenFetch {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Transport(Box::new(err))
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn request_error(status: StatusCode) -> Error {
        Error::Request {
            response: Box::new(RawResponse::new(status)),
            source: None,
        }
    }

    #[test]
    fn test_transient_statuses_are_retryable() {
        for status in [500, 502, 503, 504, 429] {
            let err = request_error(StatusCode::from_u16(status).unwrap());
            assert!(err.is_retryable(), "status {} should be retryable", status);
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for status in [400, 401, 403, 409, 501] {
            let err = request_error(StatusCode::from_u16(status).unwrap());
            assert!(!err.is_retryable(), "status {} should not be retryable", status);
        }
    }

    #[test]
    fn test_decode_failure_is_not_retryable() {
        let err = Error::Request {
            response: Box::new(RawResponse::new(StatusCode::INTERNAL_SERVER_ERROR)),
            source: Some("expected value".into()),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().starts_with("Failed to deserialize response"));
    }

    #[test]
    fn test_transport_and_timeout_are_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(Error::Transport(Box::new(io)).is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::TokenProvider("missing".into()).is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        let err = request_error(StatusCode::NOT_FOUND);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "HTTP request error: 404 Not Found");
        assert_eq!(Error::Timeout.status(), None);
    }
}
