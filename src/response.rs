//! Response types returned by the client.
//!
//! [`RawResponse`] is the response exactly as the transport produced it.
//! [`ClientResponse`] pairs it with the deserialized result, which may be absent
//! (empty body, 404, or a non-success status when status checking is off).

use http::{HeaderMap, StatusCode};
use std::borrow::Cow;
use std::time::Duration;

/// An HTTP response as returned by the [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Sets the body of the response.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The outcome of a successful call.
///
/// # Examples
///
/// ```no_run
/// use restline::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Order {
///     id: u64,
/// }
///
/// # async fn example() -> Result<(), restline::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.get::<Order>("orders/17").await?;
/// match &response.result {
///     Some(order) => println!("Order {}", order.id),
///     None => println!("No order (status {})", response.status()),
/// }
/// println!("Took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientResponse<T> {
    /// The response as returned by the transport.
    pub raw: RawResponse,

    /// The deserialized body, absent for empty bodies and tolerated
    /// non-success statuses.
    pub result: Option<T>,

    /// Time from the first attempt until this response was interpreted.
    pub latency: Duration,

    /// The number of attempts made to complete this call.
    pub attempts: usize,
}

impl<T> ClientResponse<T> {
    /// Creates a new `ClientResponse`.
    pub fn new(raw: RawResponse, result: Option<T>, latency: Duration, attempts: usize) -> Self {
        Self {
            raw,
            result,
            latency,
            attempts,
        }
    }

    /// Returns the HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    /// Maps the result to a different type, preserving the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use restline::{ClientResponse, RawResponse};
    /// # use http::StatusCode;
    /// # use std::time::Duration;
    /// let response = ClientResponse::new(
    ///     RawResponse::new(StatusCode::OK),
    ///     Some(42),
    ///     Duration::from_millis(5),
    ///     1,
    /// );
    ///
    /// let text = response.map(|n| n.to_string());
    /// assert_eq!(text.result.as_deref(), Some("42"));
    /// ```
    pub fn map<U, F>(self, f: F) -> ClientResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ClientResponse {
            raw: self.raw,
            result: self.result.map(f),
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns the result, consuming the response.
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// Returns `true` if the call required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.headers.get(name)?.to_str().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_header_lookup() {
        let mut raw = RawResponse::new(StatusCode::OK);
        raw.headers
            .insert("content-type", HeaderValue::from_static("application/json"));
        let response = ClientResponse::<()>::new(raw, None, Duration::ZERO, 3);

        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
        assert!(response.was_retried());
    }

    #[test]
    fn test_text_is_lossy() {
        let raw = RawResponse::new(StatusCode::OK).with_body(vec![b'o', b'k', 0xff]);
        assert_eq!(raw.text(), "ok\u{fffd}");
    }
}
