//! The REST client and its request pipeline.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    config::ClientConfig,
    logging,
    metadata::{PendingRequest, RequestMetadata},
    response::{ClientResponse, RawResponse},
    retry::{self, NoRetry, RetryPolicy},
    serializer::{self, EncodedBody, JsonSerializer, Serializer},
    token::TokenProvider,
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a `404 Not Found` response is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Every verb returns an absent result.
    #[default]
    AbsentForAll,
    /// Only `GET` returns an absent result; other verbs fail.
    GetOnly,
    /// 404 is treated like any other non-success status.
    Error,
}

impl NotFoundPolicy {
    fn tolerates(self, method: &Method) -> bool {
        match self {
            NotFoundPolicy::AbsentForAll => true,
            NotFoundPolicy::GetOnly => method == Method::GET,
            NotFoundPolicy::Error => false,
        }
    }
}

/// The immutable configuration a [`Client`] was built with.
#[derive(Debug)]
pub struct ClientOptions {
    base_url: Url,
    retry_policy: Arc<dyn RetryPolicy>,
    request_serializer: Arc<dyn Serializer>,
    response_serializer: Arc<dyn Serializer>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    proxy: Option<String>,
    timeout: Duration,
    log_level: Option<Level>,
    ensure_success_status_code: bool,
    not_found: NotFoundPolicy,
    default_headers: HeaderMap,
}

impl ClientOptions {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.retry_policy
    }

    pub fn request_serializer(&self) -> &Arc<dyn Serializer> {
        &self.request_serializer
    }

    pub fn response_serializer(&self) -> &Arc<dyn Serializer> {
        &self.response_serializer
    }

    pub fn token_provider(&self) -> Option<&Arc<dyn TokenProvider>> {
        self.token_provider.as_ref()
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Per-send timeout of the default transport.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Level of the request/response log events, `None` when disabled.
    pub fn log_level(&self) -> Option<Level> {
        self.log_level
    }

    pub fn ensure_success_status_code(&self) -> bool {
        self.ensure_success_status_code
    }

    pub fn not_found_policy(&self) -> NotFoundPolicy {
        self.not_found
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }
}

/// A REST client with token handling, retries and pluggable body encoding.
///
/// The client is designed to be reused across multiple requests. Cloning it
/// is cheap and clones share the same transport and token provider.
///
/// # Examples
///
/// ```no_run
/// use restline::{Client, DefaultRetry};
/// use restline::token::ClientCredentialsProvider;
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Serialize)]
/// struct CreateOrder {
///     sku: String,
///     quantity: u32,
/// }
///
/// #[derive(Deserialize)]
/// struct Order {
///     id: u64,
///     sku: String,
/// }
///
/// # async fn example() -> Result<(), restline::Error> {
/// let tokens = ClientCredentialsProvider::builder()
///     .token_endpoint("https://login.example.com/oauth2/token")
///     .client_id("orders-service")
///     .client_secret("s3cret")
///     .scopes("orders")
///     .build()?;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .retry_policy(Arc::new(DefaultRetry::new(3)))
///     .token_provider(Arc::new(tokens))
///     .build()?;
///
/// let order = client.get::<Order>("orders/123").await?;
/// if let Some(order) = order.result {
///     println!("Order {} is for {}", order.id, order.sku);
/// }
///
/// let request = CreateOrder { sku: "ABC-1".to_string(), quantity: 2 };
/// let created = client.post::<_, Order>("orders", &request).await?;
/// println!("Created in {:?}", created.latency);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    options: ClientOptions,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the options this client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Makes a typed HTTP request.
    ///
    /// The body is encoded once by the request serializer. Each attempt then
    /// asks the token provider for a token, sends the request and interprets
    /// the response; failed attempts are retried as the retry policy decides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] for non-success statuses (subject to the
    /// not-found policy and `ensure_success_status_code`) and for bodies
    /// that fail to deserialize. Token, transport and serialization failures
    /// surface as their own variants.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restline::{Client, metadata::RequestMetadata};
    /// use http::Method;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct Search { query: String }
    ///
    /// #[derive(Deserialize)]
    /// struct Results { items: Vec<String> }
    ///
    /// # async fn example() -> Result<(), restline::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let metadata = RequestMetadata::new(Method::POST, "search")
    ///     .with_query_param("page", "2")
    ///     .with_header("x-correlation-id", "abc")?;
    /// let search = Search { query: "rust".to_string() };
    ///
    /// let response = client.call::<_, Results>(metadata, Some(&search)).await?;
    /// println!("{:?}", response.result.map(|r| r.items.len()));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<Req, Res>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let options = &self.inner.options;
        let started = Instant::now();
        let url = metadata.url(&options.base_url)?;

        let encoded = match body.map(serializer::to_value).transpose()? {
            Some(value) if !value.is_null() => Some(options.request_serializer.serialize(&value)?),
            _ => None,
        };

        let result = retry::execute(
            options.retry_policy.as_ref(),
            metadata.cancellation.as_ref(),
            |attempt| self.attempt::<Res>(&metadata, &url, encoded.as_ref(), started, attempt),
        )
        .await;

        if let Err(e) = &result {
            tracing::warn!(
                error = %e,
                method = %metadata.method,
                route = %metadata.route,
                "Request failed"
            );
        }
        result
    }

    /// Runs a single attempt: authorize, send, interpret.
    async fn attempt<Res>(
        &self,
        metadata: &RequestMetadata,
        url: &Url,
        body: Option<&EncodedBody>,
        started: Instant,
        attempt: usize,
    ) -> Result<ClientResponse<Res>>
    where
        Res: DeserializeOwned,
    {
        let options = &self.inner.options;
        let mut request = PendingRequest::new(metadata.method.clone(), url.clone());

        if let Some(provider) = &options.token_provider {
            let token = provider.token().await?;
            let value = HeaderValue::try_from(token.authorization_value()).map_err(|e| {
                Error::TokenProvider(format!("Token is not a valid header value: {}", e))
            })?;
            request.headers.insert(AUTHORIZATION, value);
        }

        if let Some(body) = body {
            overlay_headers(&mut request.headers, &body.headers);
            request.body = Some(body.bytes.clone());
        }

        overlay_headers(&mut request.headers, &options.default_headers);
        overlay_headers(&mut request.headers, &metadata.headers);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt = attempt,
            "Executing HTTP request"
        );
        logging::log_request(options.log_level, &request);

        let raw = self.inner.transport.send(request).await?;
        let latency = started.elapsed();

        tracing::info!(
            status = raw.status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempt,
            "Received HTTP response"
        );
        logging::log_response(options.log_level, &raw, latency);

        let result = self.interpret(&metadata.method, &raw)?;
        Ok(ClientResponse::new(raw, result, latency, attempt))
    }

    /// Maps a response to its result or error.
    fn interpret<Res>(&self, method: &Method, raw: &RawResponse) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        let options = &self.inner.options;

        if raw.is_success() {
            return self.decode(raw);
        }

        if raw.status == StatusCode::NOT_FOUND && options.not_found.tolerates(method) {
            tracing::debug!(method = %method, "Resource not found, returning empty result");
            return Ok(None);
        }

        if !options.ensure_success_status_code {
            return Ok(None);
        }

        if raw.status.is_client_error() {
            tracing::error!(
                status = raw.status.as_u16(),
                response = %raw.text(),
                "Client error (4xx)"
            );
        } else if raw.status.is_server_error() {
            tracing::warn!(
                status = raw.status.as_u16(),
                response = %raw.text(),
                "Server error (5xx)"
            );
        }

        Err(Error::Request {
            response: Box::new(raw.clone()),
            source: None,
        })
    }

    fn decode<Res>(&self, raw: &RawResponse) -> Result<Option<Res>>
    where
        Res: DeserializeOwned,
    {
        let text = std::str::from_utf8(&raw.body).map_err(|e| undecodable(raw, Box::new(e)))?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        self.inner
            .options
            .response_serializer
            .deserialize(text)
            .map_err(|e| -> crate::BoxError { Box::new(e) })
            .and_then(|value| serializer::from_value::<Res>(value).map_err(Into::into))
            .map(Some)
            .map_err(|e| undecodable(raw, e))
    }

    /// Makes a GET request to the specified route.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restline::Client;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Entity { id: u64, value: String }
    ///
    /// # async fn example() -> Result<(), restline::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let entity = client.get::<Entity>("entities/1").await?;
    /// match entity.result {
    ///     Some(entity) => println!("{} = {}", entity.id, entity.value),
    ///     None => println!("Not found"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<Res>(&self, route: impl Into<String>) -> Result<ClientResponse<Res>>
    where
        Res: DeserializeOwned,
    {
        self.get_with(route, Vec::<(String, String)>::new(), HeaderMap::new())
            .await
    }

    /// Makes a GET request with query parameters and extra headers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restline::Client;
    /// use http::HeaderMap;
    ///
    /// # async fn example() -> Result<(), restline::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-correlation-id", "abc".parse().unwrap());
    ///
    /// let page = client
    ///     .get_with::<Vec<String>, _, _>("entities", [("page", "2")], headers)
    ///     .await?;
    /// println!("{:?}", page.result);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_with<Res, K, V>(
        &self,
        route: impl Into<String>,
        query_params: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
    ) -> Result<ClientResponse<Res>>
    where
        Res: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata = request_metadata(Method::GET, route, query_params, headers);
        self.call::<(), Res>(metadata, None).await
    }

    /// Makes a POST request to the specified route with a body.
    pub async fn post<Req, Res>(
        &self,
        route: impl Into<String>,
        body: &Req,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.post_with(route, body, Vec::<(String, String)>::new(), HeaderMap::new())
            .await
    }

    /// Makes a POST request with a body, query parameters and extra headers.
    pub async fn post_with<Req, Res, K, V>(
        &self,
        route: impl Into<String>,
        body: &Req,
        query_params: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata = request_metadata(Method::POST, route, query_params, headers);
        self.call(metadata, Some(body)).await
    }

    /// Makes a PUT request to the specified route with a body.
    pub async fn put<Req, Res>(
        &self,
        route: impl Into<String>,
        body: &Req,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.put_with(route, body, Vec::<(String, String)>::new(), HeaderMap::new())
            .await
    }

    /// Makes a PUT request with a body, query parameters and extra headers.
    pub async fn put_with<Req, Res, K, V>(
        &self,
        route: impl Into<String>,
        body: &Req,
        query_params: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata = request_metadata(Method::PUT, route, query_params, headers);
        self.call(metadata, Some(body)).await
    }

    /// Makes a PATCH request to the specified route with a body.
    pub async fn patch<Req, Res>(
        &self,
        route: impl Into<String>,
        body: &Req,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.patch_with(route, body, Vec::<(String, String)>::new(), HeaderMap::new())
            .await
    }

    /// Makes a PATCH request with a body, query parameters and extra headers.
    pub async fn patch_with<Req, Res, K, V>(
        &self,
        route: impl Into<String>,
        body: &Req,
        query_params: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
    ) -> Result<ClientResponse<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata = request_metadata(Method::PATCH, route, query_params, headers);
        self.call(metadata, Some(body)).await
    }

    /// Makes a DELETE request to the specified route.
    pub async fn delete<Res>(&self, route: impl Into<String>) -> Result<ClientResponse<Res>>
    where
        Res: DeserializeOwned,
    {
        self.delete_with(route, Vec::<(String, String)>::new(), HeaderMap::new())
            .await
    }

    /// Makes a DELETE request with query parameters and extra headers.
    pub async fn delete_with<Res, K, V>(
        &self,
        route: impl Into<String>,
        query_params: impl IntoIterator<Item = (K, V)>,
        headers: HeaderMap,
    ) -> Result<ClientResponse<Res>>
    where
        Res: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata = request_metadata(Method::DELETE, route, query_params, headers);
        self.call::<(), Res>(metadata, None).await
    }
}

fn request_metadata<K, V>(
    method: Method,
    route: impl Into<String>,
    query_params: impl IntoIterator<Item = (K, V)>,
    headers: HeaderMap,
) -> RequestMetadata
where
    K: Into<String>,
    V: Into<String>,
{
    let mut metadata = RequestMetadata::new(method, route).with_query_params(query_params);
    metadata.headers = headers;
    metadata
}

/// Builds the error for a success response whose body could not be decoded.
fn undecodable(raw: &RawResponse, cause: crate::BoxError) -> Error {
    tracing::error!(
        error = %cause,
        raw_response = %raw.text(),
        "Failed to deserialize response"
    );

    Error::Request {
        response: Box::new(raw.clone()),
        source: Some(cause),
    }
}

/// Copies `source` into `target`, replacing every header name it carries.
fn overlay_headers(target: &mut HeaderMap, source: &HeaderMap) {
    for name in source.keys() {
        target.remove(name);
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use restline::{ClientBuilder, DefaultRetry, NotFoundPolicy};
/// use restline::retry::Backoff;
/// use restline::serializer::GzipJsonSerializer;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), restline::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .retry_policy(Arc::new(DefaultRetry::new(5).with_backoff(Backoff::Linear {
///         step: Duration::from_millis(250),
///     })))
///     .request_serializer(Arc::new(GzipJsonSerializer::default()))
///     .not_found_policy(NotFoundPolicy::GetOnly)
///     .log_level(tracing::Level::DEBUG)
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    retry_policy: Arc<dyn RetryPolicy>,
    request_serializer: Arc<dyn Serializer>,
    response_serializer: Arc<dyn Serializer>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    proxy: Option<String>,
    timeout: Duration,
    log_level: Option<Level>,
    ensure_success_status_code: bool,
    not_found: NotFoundPolicy,
    default_headers: HeaderMap,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings: no retries, JSON
    /// bodies, no token provider, a 60 second timeout and strict status
    /// checking.
    pub fn new() -> Self {
        Self {
            base_url: None,
            retry_policy: Arc::new(NoRetry),
            request_serializer: Arc::new(JsonSerializer),
            response_serializer: Arc::new(JsonSerializer),
            token_provider: None,
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
            log_level: None,
            ensure_success_status_code: true,
            not_found: NotFoundPolicy::default(),
            default_headers: HeaderMap::new(),
            transport: None,
        }
    }

    /// Creates a builder from a deserialized [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for invalid values, or
    /// [`Error::InvalidArgument`] if the configured credentials are
    /// incomplete.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.into_builder()
    }

    /// Sets the base URL all routes are resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the retry policy for failed attempts.
    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the serializer used for request bodies.
    pub fn request_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.request_serializer = serializer;
        self
    }

    /// Sets the serializer used for response bodies.
    pub fn response_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.response_serializer = serializer;
        self
    }

    /// Sets the provider of the `Authorization` header.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Routes all requests through the given proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the per-send timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Logs every request and response at `level`.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// When `false`, non-success statuses are returned with an absent
    /// result instead of failing.
    pub fn ensure_success_status_code(mut self, ensure: bool) -> Self {
        self.ensure_success_status_code = ensure;
        self
    }

    pub fn not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    /// Sends requests through `transport`. Proxy and timeout settings are
    /// then up to the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if no base URL was provided,
    /// the timeout is zero, or the proxy is invalid.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::InvalidConfiguration("Base URL is required".to_string()))?;

        if self.timeout.is_zero() {
            return Err(Error::InvalidConfiguration(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout, self.proxy.as_deref())?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                options: ClientOptions {
                    base_url,
                    retry_policy: self.retry_policy,
                    request_serializer: self.request_serializer,
                    response_serializer: self.response_serializer,
                    token_provider: self.token_provider,
                    proxy: self.proxy,
                    timeout: self.timeout,
                    log_level: self.log_level,
                    ensure_success_status_code: self.ensure_success_status_code,
                    not_found: self.not_found,
                    default_headers: self.default_headers,
                },
                transport,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .build()
            .unwrap();

        let options = client.options();
        assert_eq!(options.timeout(), Duration::from_secs(60));
        assert!(options.token_provider().is_none());
        assert!(options.log_level().is_none());
        assert!(options.ensure_success_status_code());
        assert_eq!(options.not_found_policy(), NotFoundPolicy::AbsentForAll);
        assert!(options.default_headers().is_empty());
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = Client::builder().build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = Client::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_header() {
        let result = Client::builder().default_header("bad header", "x");
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_not_found_policy() {
        assert!(NotFoundPolicy::AbsentForAll.tolerates(&Method::DELETE));
        assert!(NotFoundPolicy::GetOnly.tolerates(&Method::GET));
        assert!(!NotFoundPolicy::GetOnly.tolerates(&Method::POST));
        assert!(!NotFoundPolicy::Error.tolerates(&Method::GET));
    }

    #[test]
    fn test_overlay_replaces_and_appends() {
        let mut target = HeaderMap::new();
        target.insert("content-type", HeaderValue::from_static("application/json"));
        target.insert("x-keep", HeaderValue::from_static("1"));

        let mut source = HeaderMap::new();
        source.append("content-type", HeaderValue::from_static("text/plain"));
        source.append("x-multi", HeaderValue::from_static("a"));
        source.append("x-multi", HeaderValue::from_static("b"));

        overlay_headers(&mut target, &source);

        assert_eq!(target["content-type"], "text/plain");
        assert_eq!(target["x-keep"], "1");
        let multi: Vec<_> = target.get_all("x-multi").iter().collect();
        assert_eq!(multi, vec!["a", "b"]);
    }
}
