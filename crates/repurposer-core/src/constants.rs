//! Domain-wide constants for the generation and post-sync pipeline.
//!
//! Numeric and string constants pinned down precisely (thresholds, windows,
//! probabilities) rather than left configurable. Tunables that genuinely vary
//! by deployment live in [`crate::config::PipelineConfig`] instead.

/// Minimum fingerprint similarity for the post reconciler to accept a candidate/post match.
pub const FINGERPRINT_SIMILARITY_THRESHOLD: f64 = 0.82;

/// Multiplier applied to candidate count when fetching recent platform posts.
pub const POST_FETCH_MULTIPLIER: usize = 3;

/// Floor on the number of recent platform posts fetched for matching.
pub const POST_FETCH_FLOOR: usize = 15;

/// Ceiling on the number of recent platform posts fetched for matching.
pub const POST_FETCH_CEILING: usize = 50;

/// Reuse cap applied to the "main/TikTok" video strategy and to the slideshow
/// strategy for main accounts: items with `times_generated` at or above this
/// are excluded from selection.
pub const VIDEO_REUSE_WINDOW_GENERATIONS: i32 = 2;

/// Lookback window, in days, for the "popular recent" video strategy.
pub const VIDEO_POPULAR_RECENT_WINDOW_DAYS: i64 = 30;

/// Candidate pool size for the "popular recent" video strategy.
pub const VIDEO_POPULAR_RECENT_TOP_N: usize = 10;

/// Minimum candidate pool size before falling back from "popular recent".
pub const VIDEO_POPULAR_RECENT_MIN_POOL: usize = 5;

/// Probability of preferring "never-generated" items over "popular recent" in
/// the non-main, non-TikTok video strategy.
pub const VIDEO_NEVER_GENERATED_PROBABILITY: f64 = 0.6;

/// Supported social platforms for generation requests.
pub const SUPPORTED_PLATFORMS: [&str; 2] = ["instagram", "tiktok"];
