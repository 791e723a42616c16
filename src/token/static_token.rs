use super::{Token, TokenProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// Returns whatever token the application last handed it.
///
/// No expiry check is made; the caller owns the token's lifecycle.
///
/// # Examples
///
/// ```
/// use restline::token::{StaticTokenProvider, Token, TokenProvider};
///
/// # async fn example() -> Result<(), restline::Error> {
/// let provider = StaticTokenProvider::new(Token::bearer("abc123", 3600));
/// assert_eq!(provider.token().await?.authorization_value(), "Bearer abc123");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<Token>>,
}

impl StaticTokenProvider {
    pub fn new(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// Replaces the token returned by subsequent calls.
    pub fn set_token(&self, token: Token) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<Token> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::TokenProvider("No token has been set".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unset_token_is_an_error() {
        let provider = StaticTokenProvider::default();
        assert!(matches!(
            provider.token().await,
            Err(Error::TokenProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_returns_token_verbatim_even_if_expired() {
        let provider = StaticTokenProvider::default();
        provider.set_token(Token::new("raw", 0));

        let token = provider.token().await.unwrap();
        assert_eq!(token.authorization_value(), "raw");
        assert!(token.is_expired());
    }

    #[tokio::test]
    async fn test_set_token_replaces_previous() {
        let provider = StaticTokenProvider::new(Token::bearer("first", 3600));
        provider.set_token(Token::bearer("second", 3600));
        assert_eq!(provider.token().await.unwrap().access_token(), "second");
    }
}
