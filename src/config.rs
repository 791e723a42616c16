//! Client configuration loaded from JSON.
//!
//! [`ClientConfig`] mirrors the [`ClientBuilder`] settings in a serde-friendly
//! shape so a client can be described in a settings file:
//!
//! ```
//! use restline::config::ClientConfig;
//! use restline::ClientBuilder;
//!
//! # fn example() -> Result<(), restline::Error> {
//! let config = ClientConfig::from_json_str(
//!     r#"{
//!         "base_url": "https://api.example.com",
//!         "timeout_secs": 30,
//!         "log_level": "debug",
//!         "retry": { "kind": "default", "max_retries": 5 },
//!         "request_serializer": "gzip_json",
//!         "auth": { "type": "static", "access_token": "abc123" }
//!     }"#,
//! )?;
//! let client = ClientBuilder::from_config(config)?.build()?;
//! assert_eq!(client.options().timeout().as_secs(), 30);
//! # Ok(())
//! # }
//! ```

use crate::{
    client::{ClientBuilder, NotFoundPolicy},
    retry::{Backoff, DefaultRetry, NoRetry, RetryPolicy},
    serializer::{FormUrlEncodedSerializer, GzipJsonSerializer, JsonSerializer, Serializer},
    token::{
        ClientCredentialsProvider, ResourceOwnerPasswordProvider, StaticTokenProvider, Token,
        TokenProvider,
    },
    Error, Result,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A complete client description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,

    /// Per-send timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub proxy: Option<String>,

    /// One of `error`, `warn`, `info`, `debug`, `trace`. Absent disables
    /// request/response logging.
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default = "default_true")]
    pub ensure_success_status_code: bool,

    #[serde(default)]
    pub not_found: NotFoundPolicy,

    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub request_serializer: SerializerKind,

    #[serde(default)]
    pub response_serializer: SerializerKind,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_true() -> bool {
    true
}

/// Retry policy selection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryConfig {
    #[default]
    None,
    Default {
        #[serde(default = "default_max_retries")]
        max_retries: usize,
        #[serde(default)]
        backoff: BackoffConfig,
        /// Cap for `Retry-After` delays, in seconds.
        #[serde(default)]
        max_wait_secs: Option<u64>,
    },
}

fn default_max_retries() -> usize {
    3
}

/// Delay between retries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffConfig {
    Linear {
        step_ms: u64,
    },
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        #[serde(default = "default_true")]
        jitter: bool,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig::Exponential {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        match *config {
            BackoffConfig::Linear { step_ms } => Backoff::Linear {
                step: Duration::from_millis(step_ms),
            },
            BackoffConfig::Exponential {
                initial_delay_ms,
                max_delay_ms,
                jitter,
            } => Backoff::Exponential {
                initial_delay: Duration::from_millis(initial_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                jitter,
            },
        }
    }
}

/// Body encoding selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    #[default]
    Json,
    GzipJson,
    FormUrlEncoded,
}

impl SerializerKind {
    fn build(self) -> Arc<dyn Serializer> {
        match self {
            SerializerKind::Json => Arc::new(JsonSerializer),
            SerializerKind::GzipJson => Arc::new(GzipJsonSerializer::default()),
            SerializerKind::FormUrlEncoded => Arc::new(FormUrlEncodedSerializer),
        }
    }
}

/// Token provider selection.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    ClientCredentials {
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        scopes: String,
    },
    Password {
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        scopes: String,
    },
    Static {
        access_token: String,
        #[serde(default)]
        scheme: Option<String>,
    },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::ClientCredentials {
                token_endpoint,
                client_id,
                ..
            } => f
                .debug_struct("ClientCredentials")
                .field("token_endpoint", token_endpoint)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            AuthConfig::Password {
                token_endpoint,
                client_id,
                username,
                ..
            } => f
                .debug_struct("Password")
                .field("token_endpoint", token_endpoint)
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
            AuthConfig::Static { scheme, .. } => f
                .debug_struct("Static")
                .field("scheme", scheme)
                .finish_non_exhaustive(),
        }
    }
}

impl AuthConfig {
    fn build(self) -> Result<Arc<dyn TokenProvider>> {
        let provider: Arc<dyn TokenProvider> = match self {
            AuthConfig::ClientCredentials {
                token_endpoint,
                client_id,
                client_secret,
                scopes,
            } => Arc::new(
                ClientCredentialsProvider::builder()
                    .token_endpoint(token_endpoint)
                    .client_id(client_id)
                    .client_secret(client_secret)
                    .scopes(scopes)
                    .build()?,
            ),
            AuthConfig::Password {
                token_endpoint,
                client_id,
                client_secret,
                username,
                password,
                scopes,
            } => Arc::new(
                ResourceOwnerPasswordProvider::builder()
                    .token_endpoint(token_endpoint)
                    .client_id(client_id)
                    .client_secret(client_secret)
                    .username(username)
                    .password(password)
                    .scopes(scopes)
                    .build()?,
            ),
            AuthConfig::Static {
                access_token,
                scheme,
            } => {
                if access_token.trim().is_empty() {
                    return Err(Error::InvalidConfiguration(
                        "Static access token must not be empty".to_string(),
                    ));
                }
                let token = Token::new(access_token, i64::MAX)
                    .with_scheme(scheme.unwrap_or_else(|| crate::token::BEARER.to_string()));
                Arc::new(StaticTokenProvider::new(token))
            }
        };
        Ok(provider)
    }
}

impl ClientConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the JSON is malformed or
    /// names an unknown option.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid client configuration: {}", e)))
    }

    /// Turns the configuration into a [`ClientBuilder`].
    pub fn into_builder(self) -> Result<ClientBuilder> {
        let mut builder = ClientBuilder::new()
            .base_url(&self.base_url)
            .map_err(|e| Error::InvalidConfiguration(format!("Invalid base_url: {}", e)))?
            .ensure_success_status_code(self.ensure_success_status_code)
            .not_found_policy(self.not_found)
            .retry_policy(retry_policy(&self.retry))
            .request_serializer(self.request_serializer.build())
            .response_serializer(self.response_serializer.build());

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(proxy) = self.proxy {
            builder = builder.proxy(proxy);
        }

        if let Some(level) = self.log_level {
            let level = level.parse::<tracing::Level>().map_err(|_| {
                Error::InvalidConfiguration(format!("Invalid log_level '{}'", level))
            })?;
            builder = builder.log_level(level);
        }

        for (name, value) in &self.default_headers {
            builder = builder.default_header(name, value)?;
        }

        if let Some(auth) = self.auth {
            builder = builder.token_provider(auth.build()?);
        }

        Ok(builder)
    }
}

fn retry_policy(config: &RetryConfig) -> Arc<dyn RetryPolicy> {
    match config {
        RetryConfig::None => Arc::new(NoRetry),
        RetryConfig::Default {
            max_retries,
            backoff,
            max_wait_secs,
        } => {
            let mut policy = DefaultRetry::new(*max_retries).with_backoff(backoff.into());
            if let Some(secs) = max_wait_secs {
                policy = policy.max_wait(Duration::from_secs(*secs));
            }
            Arc::new(policy)
        }
    }
}
