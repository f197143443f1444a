//! Injected cache for the remote alert directory.
//!
//! The pick-list and orchestrator read the alert directory far more often
//! than it changes. The cache holds one TTL-bounded snapshot per instance;
//! it is created alongside the runner and never stored in module-level
//! state, so its lifetime is explicit and it can be invalidated on demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{AlertProvider, ProviderError, RemoteAlert};

struct CachedDirectory {
    fetched_at: Instant,
    alerts: Vec<RemoteAlert>,
}

/// TTL cache over [`AlertProvider::list_alerts`].
pub struct AlertDirectoryCache {
    provider: Arc<dyn AlertProvider>,
    ttl: Duration,
    inner: Mutex<Option<CachedDirectory>>,
}

impl AlertDirectoryCache {
    pub fn new(provider: Arc<dyn AlertProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            inner: Mutex::new(None),
        }
    }

    /// Return the cached directory, fetching from the provider when the
    /// snapshot is missing or stale.
    pub async fn get(&self) -> Result<Vec<RemoteAlert>, ProviderError> {
        let mut guard = self.inner.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.alerts.clone());
            }
        }

        let alerts = self.provider.list_alerts().await?;
        *guard = Some(CachedDirectory {
            fetched_at: Instant::now(),
            alerts: alerts.clone(),
        });
        Ok(alerts)
    }

    /// Drop the cached snapshot without fetching a replacement.
    pub async fn invalidate(&self) {
        *self.inner.lock().await = None;
    }

    /// Fetch a fresh snapshot from the provider, replacing any cached one.
    pub async fn refresh(&self) -> Result<Vec<RemoteAlert>, ProviderError> {
        let alerts = self.provider.list_alerts().await?;
        *self.inner.lock().await = Some(CachedDirectory {
            fetched_at: Instant::now(),
            alerts: alerts.clone(),
        });
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MentionPage, MentionQuery};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AlertProvider for CountingProvider {
        async fn list_alerts(&self) -> Result<Vec<RemoteAlert>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RemoteAlert {
                id: "a1".to_string(),
                name: "Brand Watch".to_string(),
                is_active: true,
                raw: serde_json::json!({"id": "a1"}),
            }])
        }

        async fn fetch_mentions(
            &self,
            _query: &MentionQuery,
        ) -> Result<MentionPage, ProviderError> {
            Ok(MentionPage::default())
        }
    }

    fn counting_provider() -> Arc<CountingProvider> {
        Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_get_reuses_fresh_snapshot() {
        let provider = counting_provider();
        let cache = AlertDirectoryCache::new(provider.clone(), Duration::from_secs(60));

        cache.get().await.unwrap();
        cache.get().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let provider = counting_provider();
        let cache = AlertDirectoryCache::new(provider.clone(), Duration::from_secs(60));

        cache.get().await.unwrap();
        cache.invalidate().await;
        cache.get().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let provider = counting_provider();
        let cache = AlertDirectoryCache::new(provider.clone(), Duration::from_secs(60));

        cache.get().await.unwrap();
        cache.refresh().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_stale() {
        let provider = counting_provider();
        let cache = AlertDirectoryCache::new(provider.clone(), Duration::from_secs(0));

        cache.get().await.unwrap();
        cache.get().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
