//! Consumed-interface traits for the pipeline's external collaborators.
//!
//! The pipeline crate depends on these traits, not on concrete HTTP/SDK
//! clients, so it can be exercised with in-memory test doubles. Production
//! implementations live outside this crate (wherever the real render engine /
//! social gateway clients are wired up).

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a render engine invocation.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub rendered_blob_id: i64,
    pub thumbnail_blob_id: i64,
    pub video_hash: String,
    pub thumbnail_hash: String,
}

/// Given an input blob id, produces a rendered blob and thumbnail with their
/// content hashes. The hashing and rendering details are left to the
/// implementation.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(
        &self,
        input_blob_id: i64,
        use_mirror: bool,
        overlay_text: Option<&str>,
    ) -> anyhow::Result<RenderResult>;
}

/// Test/placeholder render engine that always fails; production wiring must
/// supply a real implementation before dispatching video tasks.
pub struct NoOpRenderEngine;

#[async_trait]
impl RenderEngine for NoOpRenderEngine {
    async fn render(
        &self,
        _input_blob_id: i64,
        _use_mirror: bool,
        _overlay_text: Option<&str>,
    ) -> anyhow::Result<RenderResult> {
        Err(anyhow::anyhow!("no render engine configured"))
    }
}

/// A post as reported by the social media gateway.
#[derive(Debug, Clone)]
pub struct GatewayPost {
    pub url: String,
    pub is_video: bool,
    pub video_url: Option<String>,
    pub view_count: i64,
    pub posted_at: chrono::DateTime<chrono::Utc>,
}

/// `GetPostData`, `GetUserReels`, `GetProfileData`.
#[async_trait]
pub trait SocialMediaGateway: Send + Sync {
    async fn get_post_data(&self, platform: &str, url: &str) -> anyhow::Result<GatewayPost>;

    async fn get_user_reels(
        &self,
        platform: &str,
        username: &str,
        n: usize,
    ) -> anyhow::Result<Vec<GatewayPost>>;
}

/// Test/placeholder gateway that reports no posts and no reels; production
/// wiring must supply a real per-platform client before running the post
/// reconciler against live accounts.
pub struct NoOpSocialMediaGateway;

#[async_trait]
impl SocialMediaGateway for NoOpSocialMediaGateway {
    async fn get_post_data(&self, _platform: &str, url: &str) -> anyhow::Result<GatewayPost> {
        Err(anyhow::anyhow!("no social media gateway configured for {url}"))
    }

    async fn get_user_reels(
        &self,
        _platform: &str,
        _username: &str,
        _n: usize,
    ) -> anyhow::Result<Vec<GatewayPost>> {
        Ok(Vec::new())
    }
}

/// `Get`/`Set` with TTL, JSON-encoded values. Used by the post reconciler to memoize video
/// fingerprint computations.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;

    async fn set(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Duration,
    ) -> anyhow::Result<()>;
}

/// No-op cache: every `get` misses, every `set` is a no-op. Useful in tests
/// that want to force recomputation, or as a fallback when no cache is wired.
pub struct NoOpCache;

#[async_trait]
impl Cache for NoOpCache {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _value: serde_json::Value,
        _ttl: Duration,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Minimal tenant-scoping context threaded through pipeline operations so
/// repositories can enforce client ownership without re-deriving it.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub client_id: Uuid,
}

/// A perceptual hash of a video stream, comparable via
/// [`fingerprint_similarity`]. Opaque bit vector; the concrete perceptual-
/// hashing algorithm is left to the engine implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFingerprint(pub Vec<u8>);

/// Similarity score in `[0, 1]` between two fingerprints, derived from
/// normalized Hamming distance over the shorter of the two bit vectors.
/// Fingerprints of different lengths are never a perfect match.
pub fn fingerprint_similarity(a: &VideoFingerprint, b: &VideoFingerprint) -> f64 {
    let len = a.0.len().min(b.0.len());
    if len == 0 {
        return 0.0;
    }
    let matching_bits: u32 = a.0[..len]
        .iter()
        .zip(b.0[..len].iter())
        .map(|(x, y)| (x ^ y).count_zeros())
        .sum();
    let total_bits = (len * 8) as f64;
    let score = matching_bits as f64 / total_bits;
    if a.0.len() != b.0.len() {
        // Length mismatch means the streams were not even the same
        // duration class; penalize rather than ignore the extra bits.
        score * (len as f64 / a.0.len().max(b.0.len()) as f64)
    } else {
        score
    }
}

/// Computes a perceptual fingerprint for a rendered video's URL. Left
/// abstract here; production wiring supplies a real perceptual-hashing
/// implementation.
#[async_trait]
pub trait FingerprintEngine: Send + Sync {
    async fn fingerprint(&self, video_url: &str) -> anyhow::Result<VideoFingerprint>;
}

/// Test/placeholder fingerprint engine: derives a deterministic fingerprint
/// from the URL's bytes so unit tests can exercise matching without a real
/// perceptual-hashing backend.
pub struct HashingFingerprintEngine;

#[async_trait]
impl FingerprintEngine for HashingFingerprintEngine {
    async fn fingerprint(&self, video_url: &str) -> anyhow::Result<VideoFingerprint> {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(video_url.as_bytes());
        Ok(VideoFingerprint(hasher.finalize().to_vec()))
    }
}
