use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

/// Single-value cache with an expiry. An expired value stays readable through
/// [`ExpiringCache::get_stale`] until it is replaced.
pub struct ExpiringCache<V>
where
    V: Send + Sync + 'static,
{
    inner: RwLock<Option<CacheEntry<V>>>,
}

impl<V> ExpiringCache<V>
where
    V: Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Returns the cached value if it has not expired yet.
    pub async fn get_fresh(&self) -> Option<Arc<V>> {
        let cache = self.inner.read().await;
        match cache.as_ref() {
            Some(entry) if Instant::now() < entry.expires_at => {
                debug!("Cache HIT");
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                debug!("Cache EXPIRED");
                None
            }
            None => {
                debug!("Cache MISS");
                None
            }
        }
    }

    /// Returns the cached value regardless of its expiry.
    pub async fn get_stale(&self) -> Option<Arc<V>> {
        let cache = self.inner.read().await;
        cache.as_ref().map(|entry| Arc::clone(&entry.value))
    }

    pub async fn put(&self, value: Arc<V>, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut cache = self.inner.write().await;
        debug!("Cache PUT");
        *cache = Some(entry);
    }
}

impl<V> Default for ExpiringCache<V>
where
    V: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
