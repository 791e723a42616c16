//! Request metadata, query strings and the wire-level pending request.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything outside the RFC 3986 unreserved set is escaped.
const QUERY_DATA: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds a query string from ordered key/value pairs.
///
/// Returns an empty string when there are no pairs, otherwise `?k1=v1&k2=v2`
/// with keys and values percent-encoded.
///
/// # Examples
///
/// ```
/// use restline::metadata::to_query_string;
///
/// assert_eq!(to_query_string(&[("element1", "aaa")]), "?element1=aaa");
/// assert_eq!(
///     to_query_string(&[("element1", "aaa"), ("element2", "bb=b")]),
///     "?element1=aaa&element2=bb%3Db"
/// );
/// assert_eq!(to_query_string::<&str, &str>(&[]), "");
/// ```
pub fn to_query_string<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut query = String::new();
    for (index, (key, value)) in params.iter().enumerate() {
        query.push(if index == 0 { '?' } else { '&' });
        query.extend(utf8_percent_encode(key.as_ref(), QUERY_DATA));
        query.push('=');
        query.extend(utf8_percent_encode(value.as_ref(), QUERY_DATA));
    }
    query
}

/// Metadata for an individual call.
///
/// Holds the method, the route relative to the client's base URL, ordered
/// query parameters, extra headers and an optional cancellation token.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The route, relative to the base URL (ex: `entities/1234`).
    pub route: String,

    /// Additional headers for this call. Values here replace same-named
    /// headers set by the client.
    pub headers: HeaderMap,

    /// Query parameters, in insertion order.
    pub query_params: Vec<(String, String)>,

    /// Cancels the call, including any pending retries.
    pub cancellation: Option<CancellationToken>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and route.
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            cancellation: None,
        }
    }

    /// Adds a header to the call. Repeated names keep every value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref()).map_err(|e| {
            crate::Error::InvalidConfiguration(format!("Invalid header name: {}", e))
        })?;
        let value = HeaderValue::try_from(value.as_ref()).map_err(|e| {
            crate::Error::InvalidConfiguration(format!("Invalid header value: {}", e))
        })?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the call.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters, preserving their order.
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attaches a cancellation token to the call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Resolves the full URL of this call against `base`.
    ///
    /// The route is appended to the base path, so a base of
    /// `https://host/api` and a route of `items/1` yields
    /// `https://host/api/items/1`. A query already present on the base (or
    /// on the route) is kept ahead of this call's parameters, and any
    /// fragment is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    /// if `base` cannot carry a path (ex: `mailto:` URLs).
    pub fn url(&self, base: &Url) -> Result<Url, crate::Error> {
        if base.cannot_be_a_base() {
            return Err(crate::Error::InvalidConfiguration(format!(
                "Base URL cannot carry a route: {}",
                base
            )));
        }

        let (route, route_query) = match self.route.split_once('?') {
            Some((route, query)) => (route, Some(query)),
            None => (self.route.as_str(), None),
        };
        let route = route.trim_matches('/');

        let mut url = base.clone();
        let path = format!("{}/{}", base.path().trim_end_matches('/'), route);
        url.set_path(&path);
        url.set_fragment(None);

        let params = to_query_string(&self.query_params);
        let query = [base.query(), route_query, params.strip_prefix('?')]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("&");
        url.set_query((!query.is_empty()).then_some(query.as_str()));

        Ok(url)
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

/// A fully built request, ready to hand to a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, including the query string.
    pub url: Url,
    /// All request headers, including authorization and content headers.
    pub headers: HeaderMap,
    /// The encoded body, if any.
    pub body: Option<Vec<u8>>,
}

impl PendingRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}
