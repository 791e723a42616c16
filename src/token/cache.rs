use super::Token;
use crate::Result;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;

/// Holds one cached token and refreshes it at most once at a time.
///
/// Cache hits only take a short read lock on the slot, so they never wait on
/// a refresh in progress. Callers that find the token missing or expired
/// queue on the refresh lock; the first one fetches, the rest re-check the
/// slot once they get the lock and reuse the fresh token.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: RwLock<Option<Token>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it is present and not expired.
    pub fn current(&self) -> Option<Token> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| !token.is_expired())
            .cloned()
    }

    /// Returns the cached token, or runs `fetch` to obtain a fresh one.
    ///
    /// A failed fetch leaves the previously cached token in place and returns
    /// the error.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Token>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Token>>,
    {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;

        if let Some(token) = self.current() {
            tracing::trace!("Token refreshed by a concurrent caller");
            return Ok(token);
        }

        let token = fetch().await?;
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached token so the next call fetches a new one.
    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cache_returns_same_value() {
        let cache = TokenCache::new();
        let fetches = &AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_fetch(move || async move {
                    let n = fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(Token::bearer(format!("token-{}", n), 3600))
                })
                .await
                .unwrap();
            assert_eq!(token.access_token(), "token-0");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refetches_expired_token() {
        let cache = TokenCache::new();
        let fetches = &AtomicUsize::new(0);

        let fetch = move || async move {
            let n = fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Token::bearer(format!("token-{}", n), 30))
        };

        let first = cache.get_or_fetch(fetch).await.unwrap();
        let second = cache.get_or_fetch(fetch).await.unwrap();
        assert_eq!(first.access_token(), "token-0");
        assert_eq!(second.access_token(), "token-1");
        assert!(cache.current().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = Arc::new(TokenCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..32 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            tasks.spawn(async move {
                let fetches = &fetches;
                cache
                    .get_or_fetch(move || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(Token::bearer("shared", 3600))
                    })
                    .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            assert_eq!(joined.unwrap().unwrap().access_token(), "shared");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates_and_keeps_cache_empty() {
        let cache = TokenCache::new();

        let result = cache
            .get_or_fetch(|| async { Err(Error::token_fetch("boom", "unreachable")) })
            .await;
        assert!(matches!(result, Err(Error::TokenFetch { .. })));
        assert!(cache.current().is_none());

        let token = cache
            .get_or_fetch(|| async { Ok(Token::bearer("recovered", 3600)) })
            .await
            .unwrap();
        assert_eq!(token.access_token(), "recovered");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = TokenCache::new();
        cache
            .get_or_fetch(|| async { Ok(Token::bearer("first", 3600)) })
            .await
            .unwrap();

        cache.invalidate();
        let token = cache
            .get_or_fetch(|| async { Ok(Token::bearer("second", 3600)) })
            .await
            .unwrap();
        assert_eq!(token.access_token(), "second");
    }
}
