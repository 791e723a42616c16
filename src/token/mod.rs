//! Bearer tokens and the providers that produce them.
//!
//! A [`TokenProvider`] hands the client a [`Token`] for every attempt. The
//! OAuth2 providers ([`ClientCredentialsProvider`] and
//! [`ResourceOwnerPasswordProvider`]) keep their token in a [`TokenCache`] so
//! that concurrent calls share one fetch.

mod cache;
mod flow;
mod pass_through;
mod static_token;

pub use cache::TokenCache;
pub use flow::{
    ClientCredentialsProvider, ClientCredentialsProviderBuilder, ResourceOwnerPasswordProvider,
    ResourceOwnerPasswordProviderBuilder,
};
pub use pass_through::{InboundContext, InboundRequest, PassThroughTokenProvider};
pub use static_token::StaticTokenProvider;

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// Tokens expiring within this many seconds are treated as already expired.
pub const EXPIRY_MARGIN_SECS: i64 = 90;

/// The scheme stamped on tokens fetched from a token endpoint.
pub const BEARER: &str = "Bearer";

/// A credential used to authorize outgoing requests.
///
/// The expiry instant is derived when the token is built:
/// `expires_at = now + expires_in`.
#[derive(Clone, PartialEq)]
pub struct Token {
    access_token: String,
    identity_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: i64,
    expires_at: DateTime<Utc>,
    scheme: String,
}

impl Token {
    /// Creates a token without a scheme that expires `expires_in` seconds
    /// from now.
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        let expires_at = TimeDelta::try_seconds(expires_in)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(if expires_in < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });

        Self {
            access_token: access_token.into(),
            identity_token: None,
            refresh_token: None,
            expires_in,
            expires_at,
            scheme: String::new(),
        }
    }

    /// Creates a `Bearer` token that expires `expires_in` seconds from now.
    pub fn bearer(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self::new(access_token, expires_in).with_scheme(BEARER)
    }

    /// Sets the authorization scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the identity token.
    pub fn with_identity_token(mut self, identity_token: impl Into<String>) -> Self {
        self.identity_token = Some(identity_token.into());
        self
    }

    /// Sets the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn identity_token(&self) -> Option<&str> {
        self.identity_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Lifetime in seconds, as reported when the token was issued.
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// The authorization scheme, empty when the token is sent raw.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns `true` if the token expires within [`EXPIRY_MARGIN_SECS`].
    pub fn is_expired(&self) -> bool {
        self.expires_at - Utc::now() <= TimeDelta::seconds(EXPIRY_MARGIN_SECS)
    }

    /// The `Authorization` header value: `"{scheme} {token}"`, or the bare
    /// token when there is no scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// use restline::token::Token;
    ///
    /// assert_eq!(Token::bearer("abc123", 3600).authorization_value(), "Bearer abc123");
    /// assert_eq!(Token::new("abc123", 3600).authorization_value(), "abc123");
    /// ```
    pub fn authorization_value(&self) -> String {
        if self.scheme.trim().is_empty() {
            self.access_token.clone()
        } else {
            format!("{} {}", self.scheme, self.access_token)
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("identity_token", &self.identity_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Produces the token attached to each outgoing request.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use restline::token::{Token, TokenProvider};
///
/// #[derive(Debug)]
/// struct FromEnvironment;
///
/// #[async_trait]
/// impl TokenProvider for FromEnvironment {
///     async fn token(&self) -> restline::Result<Token> {
///         let value = std::env::var("API_TOKEN")
///             .map_err(|e| restline::Error::TokenProvider(e.to_string()))?;
///         Ok(Token::bearer(value, i64::MAX))
///     }
/// }
/// ```
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Returns a token to authorize the next request.
    async fn token(&self) -> Result<Token>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_not_expired() {
        assert!(!Token::new("a", 3600).is_expired());
    }

    #[test]
    fn test_token_is_expired_if_less_than_90() {
        assert!(Token::new("a", 40).is_expired());
        assert!(Token::new("a", 90).is_expired());
    }

    #[test]
    fn test_token_is_expired_if_0() {
        assert!(Token::new("a", 0).is_expired());
        assert!(Token::new("a", -10).is_expired());
    }

    #[test]
    fn test_extreme_lifetimes_do_not_overflow() {
        assert!(!Token::new("a", i64::MAX).is_expired());
        assert!(Token::new("a", i64::MIN).is_expired());
    }

    #[test]
    fn test_expires_at_is_derived_from_expires_in() {
        let before = Utc::now();
        let token = Token::new("a", 600);
        let delta = token.expires_at() - before;
        assert!(delta >= TimeDelta::seconds(599) && delta <= TimeDelta::seconds(601));
    }

    #[test]
    fn test_authorization_value() {
        let token = Token::bearer("aaaa", 3600);
        assert_eq!(token.authorization_value(), "Bearer aaaa");
        assert_eq!(token.with_scheme("").authorization_value(), "aaaa");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = Token::bearer("super-secret", 3600).with_refresh_token("also-secret");
        let printed = format!("{:?}", token);
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("also-secret"));
        assert!(printed.contains("Bearer"));
    }
}
