use super::{Token, TokenProvider, BEARER};
use crate::{Error, Result};
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static INBOUND_HEADERS: HeaderMap;
}

/// Access to the request a server is currently handling.
pub trait InboundContext: Send + Sync + fmt::Debug {
    /// The raw `Authorization` header of the inbound request, if any.
    fn authorization(&self) -> Option<String>;
}

impl InboundContext for HeaderMap {
    fn authorization(&self) -> Option<String> {
        self.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

/// Exposes the headers of the inbound request being served on the current
/// task.
///
/// Server code wraps its handler in [`InboundRequest::scope`]; any
/// [`PassThroughTokenProvider`] called inside that future sees the headers.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use restline::token::{InboundRequest, PassThroughTokenProvider, TokenProvider};
///
/// # async fn example() -> Result<(), restline::Error> {
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", "Bearer abc123".parse().unwrap());
///
/// let provider = PassThroughTokenProvider::default();
/// let token = InboundRequest::scope(headers, async { provider.token().await }).await?;
/// assert_eq!(token.authorization_value(), "Bearer abc123");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct InboundRequest;

impl InboundRequest {
    /// Runs `future` with `headers` as the inbound request.
    pub async fn scope<F>(headers: HeaderMap, future: F) -> F::Output
    where
        F: Future,
    {
        INBOUND_HEADERS.scope(headers, future).await
    }
}

impl InboundContext for InboundRequest {
    fn authorization(&self) -> Option<String> {
        INBOUND_HEADERS
            .try_with(|headers| headers.authorization())
            .ok()
            .flatten()
    }
}

/// Forwards the caller's own `Authorization` header to the downstream
/// service.
///
/// A `Bearer` prefix is split off into the token scheme; any other value is
/// forwarded as-is.
#[derive(Debug, Clone)]
pub struct PassThroughTokenProvider {
    context: Arc<dyn InboundContext>,
}

impl PassThroughTokenProvider {
    pub fn new(context: Arc<dyn InboundContext>) -> Self {
        Self { context }
    }
}

impl Default for PassThroughTokenProvider {
    fn default() -> Self {
        Self::new(Arc::new(InboundRequest))
    }
}

#[async_trait]
impl TokenProvider for PassThroughTokenProvider {
    async fn token(&self) -> Result<Token> {
        let header = self.context.authorization().ok_or_else(|| {
            Error::TokenProvider("Authorization not present on incoming request".to_string())
        })?;

        Ok(parse_authorization(&header))
    }
}

fn parse_authorization(header: &str) -> Token {
    let header = header.trim();
    let prefix_len = BEARER.len();

    if header.len() > prefix_len
        && header.is_char_boundary(prefix_len)
        && header[..prefix_len].eq_ignore_ascii_case(BEARER)
        && header[prefix_len..].starts_with(char::is_whitespace)
    {
        return Token::bearer(header[prefix_len..].trim_start(), i64::MAX);
    }

    Token::new(header, i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    #[tokio::test]
    async fn test_bearer_prefix_is_split_off() {
        let provider = PassThroughTokenProvider::new(Arc::new(headers("Bearer abc123")));
        let token = provider.token().await.unwrap();
        assert_eq!(token.access_token(), "abc123");
        assert_eq!(token.scheme(), "Bearer");
        assert_eq!(token.authorization_value(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_lowercase_bearer_prefix() {
        let provider = PassThroughTokenProvider::new(Arc::new(headers("bearer abc123")));
        assert_eq!(provider.token().await.unwrap().access_token(), "abc123");
    }

    #[tokio::test]
    async fn test_raw_value_is_forwarded() {
        let provider = PassThroughTokenProvider::new(Arc::new(headers("dassdfasdf")));
        let token = provider.token().await.unwrap();
        assert_eq!(token.access_token(), "dassdfasdf");
        assert_eq!(token.authorization_value(), "dassdfasdf");
    }

    #[tokio::test]
    async fn test_token_starting_with_bearer_letters_is_kept_whole() {
        let provider = PassThroughTokenProvider::new(Arc::new(headers("Bearerish")));
        assert_eq!(provider.token().await.unwrap().access_token(), "Bearerish");
    }

    #[tokio::test]
    async fn test_missing_header_is_an_error() {
        let provider = PassThroughTokenProvider::new(Arc::new(HeaderMap::new()));
        match provider.token().await {
            Err(Error::TokenProvider(message)) => {
                assert_eq!(message, "Authorization not present on incoming request")
            }
            other => panic!("Expected TokenProvider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_task_local_scope() {
        let provider = PassThroughTokenProvider::default();

        let token = InboundRequest::scope(headers("Bearer from-scope"), async {
            provider.token().await
        })
        .await
        .unwrap();
        assert_eq!(token.access_token(), "from-scope");

        assert!(matches!(
            provider.token().await,
            Err(Error::TokenProvider(_))
        ));
    }

    #[test]
    fn test_forwarded_tokens_do_not_expire() {
        assert!(!parse_authorization("Bearer x").is_expired());
    }
}
