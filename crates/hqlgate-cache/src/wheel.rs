use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hqlgate_common::{GatewayError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time-wheel sizing parameters.
///
/// The wheel holds `max_ttl_secs * granularity` slots; `granularity` is the
/// number of sub-second ticks per second of TTL resolution, so the sweep
/// fires every `1000 / granularity` milliseconds.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Longest accepted TTL, in seconds
    pub max_ttl_secs: u64,
    /// Ticks per second
    pub granularity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_ttl_secs: 3600,
            granularity: 10,
        }
    }
}

/// TTL cache backed by a circular array of expiry slots.
///
/// Keys are scheduled into the slot the cursor will reach when their TTL
/// elapses; the purge sweep drains exactly one slot per tick. There is no
/// delete or update operation: the only state-removal path is expiry, and
/// re-inserting a live key is rejected.
pub struct TimeWheelCache<V> {
    inner: Mutex<WheelInner<V>>,
    slot_count: usize,
    max_ttl_secs: u64,
    granularity: u64,
}

struct WheelInner<V> {
    entries: HashMap<String, V>,
    slots: Vec<Vec<String>>,
    cursor: usize,
}

impl<V> TimeWheelCache<V>
where
    V: Clone + Send + 'static,
{
    /// Allocates the wheel. Does not spawn the purge sweep; see
    /// [`spawn_purge`](Self::spawn_purge).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if either sizing parameter is zero or
    /// the granularity exceeds 1000 (the tick period is `1000ms / granularity`).
    pub fn new(config: CacheConfig) -> Result<Self> {
        if config.max_ttl_secs == 0 {
            return Err(GatewayError::Config("cache max_ttl_secs must be nonzero".into()));
        }
        if config.granularity == 0 || config.granularity > 1000 {
            return Err(GatewayError::Config("cache granularity must be in 1..=1000".into()));
        }
        let slot_count = (config.max_ttl_secs * config.granularity) as usize;
        Ok(Self {
            inner: Mutex::new(WheelInner {
                entries: HashMap::new(),
                slots: vec![Vec::new(); slot_count],
                cursor: 0,
            }),
            slot_count,
            max_ttl_secs: config.max_ttl_secs,
            granularity: config.granularity,
        })
    }

    /// Inserts a value that will expire `ttl_secs` from now, rounded up to
    /// the next tick.
    ///
    /// # Errors
    ///
    /// - `ZeroTtl` if `ttl_secs` is 0
    /// - `TtlTooLarge` if `ttl_secs` exceeds the configured maximum
    /// - `DuplicateKey` if the key is already live; the existing entry is
    ///   left untouched
    pub fn set(&self, key: String, value: V, ttl_secs: u64) -> Result<()> {
        if ttl_secs == 0 {
            return Err(GatewayError::ZeroTtl);
        }
        if ttl_secs > self.max_ttl_secs {
            return Err(GatewayError::TtlTooLarge { max: self.max_ttl_secs });
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.contains_key(&key) {
            return Err(GatewayError::DuplicateKey);
        }
        let slot = (inner.cursor + (ttl_secs * self.granularity) as usize) % self.slot_count;
        inner.slots[slot].push(key.clone());
        inner.entries.insert(key, value);
        Ok(())
    }

    /// Looks up a live entry. Never affects the expiry schedule.
    pub fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.get(key).cloned()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the cursor one slot and drains everything scheduled there.
    fn advance(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let cursor = (inner.cursor + 1) % self.slot_count;
        inner.cursor = cursor;
        let expired = std::mem::take(&mut inner.slots[cursor]);
        if !expired.is_empty() {
            for key in &expired {
                inner.entries.remove(key);
            }
            debug!(count = expired.len(), "purged expired cache entries");
        }
    }

    /// Spawns the perpetual purge sweep.
    ///
    /// The sweep ticks every `1000ms / granularity`, advancing the cursor by
    /// exactly one slot per tick, and stops when `shutdown` is cancelled.
    /// The returned handle can be awaited for a deterministic shutdown.
    pub fn spawn_purge(cache: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let period = Duration::from_millis(1000 / cache.granularity);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            info!(period_ms = period.as_millis() as u64, "cache purge sweep started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("cache purge sweep stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        cache.advance();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache() -> TimeWheelCache<String> {
        // 10-second wheel at one tick per second keeps tests cheap
        TimeWheelCache::new(CacheConfig {
            max_ttl_secs: 10,
            granularity: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_set_then_get() {
        let cache = small_cache();
        cache.set("k".into(), "v".into(), 5).unwrap();
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let cache = small_cache();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let cache = small_cache();
        let err = cache.set("k".into(), "v".into(), 0).unwrap_err();
        assert!(matches!(err, GatewayError::ZeroTtl));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_ttl_over_max_rejected() {
        let cache = small_cache();
        let err = cache.set("k".into(), "v".into(), 11).unwrap_err();
        assert!(matches!(err, GatewayError::TtlTooLarge { max: 10 }));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_ttl_exactly_max_accepted() {
        let cache = small_cache();
        cache.set("k".into(), "v".into(), 10).unwrap();
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_duplicate_key_rejected_keeps_first_value() {
        let cache = small_cache();
        cache.set("k".into(), "first".into(), 5).unwrap();
        let err = cache.set("k".into(), "second".into(), 5).unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateKey));
        assert_eq!(cache.get("k"), Some("first".to_string()));
    }

    #[test]
    fn test_cache_usable_after_duplicate_rejection() {
        // the rejection path must release the lock like every other path
        let cache = small_cache();
        cache.set("k".into(), "v".into(), 5).unwrap();
        assert!(cache.set("k".into(), "v2".into(), 5).is_err());
        cache.set("other".into(), "v3".into(), 5).unwrap();
        assert_eq!(cache.get("other"), Some("v3".to_string()));
    }

    #[test]
    fn test_entry_survives_until_ttl_tick() {
        let cache = small_cache();
        cache.set("k".into(), "v".into(), 3).unwrap();
        for _ in 0..2 {
            cache.advance();
            assert_eq!(cache.get("k"), Some("v".to_string()));
        }
        cache.advance();
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_wraps_around_wheel() {
        let cache = small_cache();
        // push the cursor near the end of the 10-slot ring
        for _ in 0..8 {
            cache.advance();
        }
        cache.set("k".into(), "v".into(), 5).unwrap();
        for _ in 0..4 {
            cache.advance();
            assert_eq!(cache.get("k"), Some("v".to_string()));
        }
        cache.advance();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_distinct_keys_expire_on_own_schedule() {
        let cache = small_cache();
        for ttl in 1..=10u64 {
            cache.set(format!("k{}", ttl), format!("v{}", ttl), ttl).unwrap();
        }
        for tick in 1..=10u64 {
            cache.advance();
            for ttl in 1..=10u64 {
                let key = format!("k{}", ttl);
                if ttl <= tick {
                    assert_eq!(cache.get(&key), None, "k{} should be gone at tick {}", ttl, tick);
                } else {
                    assert!(cache.get(&key).is_some(), "k{} should live at tick {}", ttl, tick);
                }
            }
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_set_of_distinct_keys() {
        let cache = Arc::new(
            TimeWheelCache::new(CacheConfig {
                max_ttl_secs: 10,
                granularity: 1,
            })
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..125u64 {
                        let key = format!("w{}-{}", worker, i);
                        cache.set(key, "v".to_string(), (i % 10) + 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 1000);
        // drain the whole wheel; everything scheduled must be gone after
        for _ in 0..10 {
            cache.advance();
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rejects_zero_sized_wheel() {
        assert!(TimeWheelCache::<String>::new(CacheConfig {
            max_ttl_secs: 0,
            granularity: 10,
        })
        .is_err());
        assert!(TimeWheelCache::<String>::new(CacheConfig {
            max_ttl_secs: 10,
            granularity: 0,
        })
        .is_err());
        assert!(TimeWheelCache::<String>::new(CacheConfig {
            max_ttl_secs: 10,
            granularity: 1001,
        })
        .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_sweep_expires_entries() {
        let cache = Arc::new(
            TimeWheelCache::new(CacheConfig {
                max_ttl_secs: 60,
                granularity: 10,
            })
            .unwrap(),
        );
        let shutdown = CancellationToken::new();
        let handle = TimeWheelCache::spawn_purge(Arc::clone(&cache), shutdown.clone());

        cache.set("k".into(), "v".to_string(), 1).unwrap();

        // half the TTL: still present
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(cache.get("k"), Some("v".to_string()));

        // one full TTL plus one tick of slack
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(cache.get("k"), None);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_sweep_shutdown_is_prompt() {
        let cache: Arc<TimeWheelCache<String>> =
            Arc::new(TimeWheelCache::new(CacheConfig::default()).unwrap());
        let shutdown = CancellationToken::new();
        let handle = TimeWheelCache::spawn_purge(Arc::clone(&cache), shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep should stop on cancellation")
            .unwrap();
    }
}
