use super::{Token, TokenCache, TokenProvider};
use crate::metadata::PendingRequest;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Method};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(60);

/// Token endpoint plumbing shared by the OAuth2 providers.
///
/// Each flow owns its own cache, so two providers never share a token.
#[derive(Debug)]
pub(crate) struct TokenFlow {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    cache: TokenCache,
}

impl TokenFlow {
    fn new(endpoint: Url, transport: Option<Arc<dyn Transport>>) -> Result<Self> {
        let transport = match transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(TOKEN_ENDPOINT_TIMEOUT, None)?),
        };

        Ok(Self {
            endpoint,
            transport,
            cache: TokenCache::new(),
        })
    }

    async fn token(&self, form: &[(&str, &str)]) -> Result<Token> {
        self.cache.get_or_fetch(move || self.fetch(form)).await
    }

    async fn fetch(&self, form: &[(&str, &str)]) -> Result<Token> {
        tracing::debug!(endpoint = %self.endpoint, "Fetching access token");

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();

        let mut request = PendingRequest::new(Method::POST, self.endpoint.clone());
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request
            .headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request.body = Some(body.into_bytes());

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| Error::token_fetch("token endpoint could not be reached", e))?;

        if !response.is_success() {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = %response.status,
                "Token endpoint returned a non-success status"
            );
            return Err(Error::TokenFetch {
                message: format!("token endpoint returned {}", response.status),
                source: None,
            });
        }

        let value: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| Error::token_fetch("token response is not valid JSON", e))?;
        let parsed: TokenResponse = crate::serializer::from_value(value)
            .map_err(|e| Error::token_fetch("token response could not be parsed", e))?;

        tracing::debug!(expires_in = parsed.expires_in, "Access token fetched");
        Ok(parsed.into_token())
    }

    fn invalidate(&self) {
        self.cache.invalidate();
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, alias = "id_token")]
    identity_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lifetime_seconds")]
    expires_in: i64,
}

impl TokenResponse {
    fn into_token(self) -> Token {
        let mut token = Token::bearer(self.access_token, self.expires_in);
        if let Some(identity_token) = self.identity_token {
            token = token.with_identity_token(identity_token);
        }
        if let Some(refresh_token) = self.refresh_token {
            token = token.with_refresh_token(refresh_token);
        }
        token
    }
}

/// Accepts `3600` as well as `"3600"`.
fn lifetime_seconds<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lifetime {
        Seconds(i64),
        Text(String),
    }

    match Lifetime::deserialize(deserializer)? {
        Lifetime::Seconds(seconds) => Ok(seconds),
        Lifetime::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("expires_in '{}' is not a number", text))
        }),
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::InvalidArgument(format!("{} must not be empty", name))),
    }
}

fn endpoint(value: Option<String>) -> Result<Url> {
    let value = required(value, "token_endpoint")?;
    Url::parse(&value)
        .map_err(|e| Error::InvalidArgument(format!("token_endpoint is not a valid URL: {}", e)))
}

/// Fetches tokens with the OAuth2 `client_credentials` grant.
///
/// # Examples
///
/// ```no_run
/// use restline::token::{ClientCredentialsProvider, TokenProvider};
///
/// # async fn example() -> Result<(), restline::Error> {
/// let provider = ClientCredentialsProvider::builder()
///     .token_endpoint("https://login.example.com/oauth2/token")
///     .client_id("my-service")
///     .client_secret("s3cret")
///     .scopes("orders.read orders.write")
///     .build()?;
///
/// let token = provider.token().await?;
/// println!("{}", token.authorization_value());
/// # Ok(())
/// # }
/// ```
pub struct ClientCredentialsProvider {
    client_id: String,
    client_secret: String,
    scopes: String,
    flow: TokenFlow,
}

impl ClientCredentialsProvider {
    pub fn builder() -> ClientCredentialsProviderBuilder {
        ClientCredentialsProviderBuilder::default()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    /// Drops the cached token so the next call fetches a new one.
    pub fn invalidate(&self) {
        self.flow.invalidate();
    }
}

impl fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("endpoint", &self.flow.endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn token(&self) -> Result<Token> {
        self.flow
            .token(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scopes.as_str()),
            ])
            .await
    }
}

/// Builder for [`ClientCredentialsProvider`].
#[derive(Default)]
pub struct ClientCredentialsProviderBuilder {
    token_endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientCredentialsProviderBuilder {
    pub fn token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(token_endpoint.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Space-separated scopes sent as the `scope` form field.
    pub fn scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = Some(scopes.into());
        self
    }

    /// Sends token requests through `transport` instead of a dedicated
    /// client with a 60 second timeout.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the endpoint, client id or
    /// client secret is missing or empty, the endpoint is not a URL, or no
    /// scopes were given.
    pub fn build(self) -> Result<ClientCredentialsProvider> {
        let endpoint = endpoint(self.token_endpoint)?;
        let client_id = required(self.client_id, "client_id")?;
        let client_secret = required(self.client_secret, "client_secret")?;
        let scopes = self
            .scopes
            .ok_or_else(|| Error::InvalidArgument("scopes must be provided".to_string()))?;

        Ok(ClientCredentialsProvider {
            client_id,
            client_secret,
            scopes,
            flow: TokenFlow::new(endpoint, self.transport)?,
        })
    }
}

/// Fetches tokens with the OAuth2 resource owner `password` grant.
pub struct ResourceOwnerPasswordProvider {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    scopes: String,
    flow: TokenFlow,
}

impl ResourceOwnerPasswordProvider {
    pub fn builder() -> ResourceOwnerPasswordProviderBuilder {
        ResourceOwnerPasswordProviderBuilder::default()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    /// Drops the cached token so the next call fetches a new one.
    pub fn invalidate(&self) {
        self.flow.invalidate();
    }
}

impl fmt::Debug for ResourceOwnerPasswordProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOwnerPasswordProvider")
            .field("endpoint", &self.flow.endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for ResourceOwnerPasswordProvider {
    async fn token(&self) -> Result<Token> {
        self.flow
            .token(&[
                ("grant_type", "password"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("scope", self.scopes.as_str()),
            ])
            .await
    }
}

/// Builder for [`ResourceOwnerPasswordProvider`].
#[derive(Default)]
pub struct ResourceOwnerPasswordProviderBuilder {
    token_endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
    scopes: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl ResourceOwnerPasswordProviderBuilder {
    pub fn token_endpoint(mut self, token_endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(token_endpoint.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = Some(scopes.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Errors
    ///
    /// Same rules as [`ClientCredentialsProviderBuilder::build`], and the
    /// username and password must not be empty.
    pub fn build(self) -> Result<ResourceOwnerPasswordProvider> {
        let endpoint = endpoint(self.token_endpoint)?;
        let client_id = required(self.client_id, "client_id")?;
        let client_secret = required(self.client_secret, "client_secret")?;
        let username = required(self.username, "username")?;
        let password = required(self.password, "password")?;
        let scopes = self
            .scopes
            .ok_or_else(|| Error::InvalidArgument("scopes must be provided".to_string()))?;

        Ok(ResourceOwnerPasswordProvider {
            client_id,
            client_secret,
            username,
            password,
            scopes,
            flow: TokenFlow::new(endpoint, self.transport)?,
        })
    }
}
