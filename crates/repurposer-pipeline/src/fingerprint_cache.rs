//! Fingerprint cache for the post reconciler.
//!
//! An in-process `Mutex<HashMap<K, (Instant, V)>>` TTL memo: a
//! `tokio::sync::Mutex`-guarded map keyed by a hashable key, the same idiom
//! this workspace uses elsewhere for per-process rate limiting, here reused
//! to memoize a fingerprint computation instead of a token bucket. Also
//! backed by the generic [`repurposer_core::Cache`] consumed-interface trait
//! so a real deployment can swap in a shared cache without this type
//! changing shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use repurposer_core::{Cache, FingerprintEngine, VideoFingerprint};
use tokio::sync::Mutex;

/// Wraps a [`FingerprintEngine`] with an in-process TTL memo keyed by video
/// URL, so `generate(url); generate(url)` within the TTL window issues only
/// one underlying computation.
#[derive(Clone)]
pub struct FingerprintCache {
    engine: Arc<dyn FingerprintEngine>,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, (Instant, VideoFingerprint)>>>,
}

impl FingerprintCache {
    pub fn new(engine: Arc<dyn FingerprintEngine>, ttl: Duration) -> Self {
        Self {
            engine,
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Computes (or returns the cached) fingerprint for `video_url`.
    pub async fn fingerprint(&self, video_url: &str) -> anyhow::Result<VideoFingerprint> {
        {
            let entries = self.entries.lock().await;
            if let Some((inserted_at, fp)) = entries.get(video_url) {
                if inserted_at.elapsed() < self.ttl {
                    return Ok(fp.clone());
                }
            }
        }

        let fp = self.engine.fingerprint(video_url).await?;

        let mut entries = self.entries.lock().await;
        entries.insert(video_url.to_string(), (Instant::now(), fp.clone()));
        Ok(fp)
    }
}

/// A [`Cache`]-backed variant, for deployments that want the fingerprint memo
/// to live in a shared cache (Redis, etc.) rather than per-process memory.
/// JSON-encodes the fingerprint bytes, since the consumed `Cache` contract
/// deals in bytes, not typed values.
pub struct SharedFingerprintCache {
    engine: Arc<dyn FingerprintEngine>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl SharedFingerprintCache {
    pub fn new(engine: Arc<dyn FingerprintEngine>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { engine, cache, ttl }
    }

    fn cache_key(video_url: &str) -> String {
        format!("fingerprint:{video_url}")
    }

    pub async fn fingerprint(&self, video_url: &str) -> anyhow::Result<VideoFingerprint> {
        let key = Self::cache_key(video_url);
        if let Some(value) = self.cache.get(&key).await? {
            if let Ok(bytes) = serde_json::from_value::<Vec<u8>>(value) {
                return Ok(VideoFingerprint(bytes));
            }
        }

        let fp = self.engine.fingerprint(video_url).await?;
        self.cache
            .set(&key, serde_json::json!(fp.0), self.ttl)
            .await?;
        Ok(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FingerprintEngine for CountingEngine {
        async fn fingerprint(&self, video_url: &str) -> anyhow::Result<VideoFingerprint> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VideoFingerprint(video_url.as_bytes().to_vec()))
        }
    }

    #[tokio::test]
    async fn repeated_lookup_within_ttl_hits_cache_once() {
        let engine = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let cache = FingerprintCache::new(engine.clone(), Duration::from_secs(60));

        let a = cache.fingerprint("https://example.com/a.mp4").await.unwrap();
        let b = cache.fingerprint("https://example.com/a.mp4").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let engine = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let cache = FingerprintCache::new(engine.clone(), Duration::from_millis(10));

        cache.fingerprint("https://example.com/a.mp4").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.fingerprint("https://example.com/a.mp4").await.unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_urls_are_cached_independently() {
        let engine = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let cache = FingerprintCache::new(engine, Duration::from_secs(60));

        let a = cache.fingerprint("https://example.com/a.mp4").await.unwrap();
        let b = cache.fingerprint("https://example.com/b.mp4").await.unwrap();
        assert_ne!(a, b);
    }
}
