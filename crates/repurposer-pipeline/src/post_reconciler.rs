//! Post Reconciler.
//!
//! Matches an account's unposted rendered videos against its recent platform
//! posts by perceptual fingerprint, under the single-flight guard
//! [`crate::sync_status_tracker::SyncStatusTracker`] provides. A blob id has
//! no defined URL-resolution contract in this spec, so candidates are
//! fingerprinted by a synthetic `blob://{file_id}` identifier — sufficient
//! for the fingerprint engine's contract, which only needs a stable string
//! per blob.

use rand::Rng;
use repurposer_core::models::{AccountSyncStatus, GeneratedContent, GeneratedContentFile};
use repurposer_core::{PipelineConfig, PipelineError, SocialMediaGateway, VideoFingerprint};
use repurposer_db::{AccountRepository, GeneratedContentRepository, PostRepository};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::event_stream::EventStream;
use crate::fingerprint_cache::FingerprintCache;
use crate::sync_status_tracker::SyncStatusTracker;

struct Candidate {
    content: GeneratedContent,
    file: GeneratedContentFile,
    fingerprint: VideoFingerprint,
}

#[derive(Clone)]
pub struct PostReconciler {
    accounts: AccountRepository,
    generated_content: GeneratedContentRepository,
    posts: PostRepository,
    sync_status: SyncStatusTracker,
    fingerprints: FingerprintCache,
    gateway: Arc<dyn SocialMediaGateway>,
    events: EventStream,
    config: PipelineConfig,
}

impl PostReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: AccountRepository,
        generated_content: GeneratedContentRepository,
        posts: PostRepository,
        sync_status: SyncStatusTracker,
        fingerprints: FingerprintCache,
        gateway: Arc<dyn SocialMediaGateway>,
        events: EventStream,
        config: PipelineConfig,
    ) -> Self {
        Self {
            accounts,
            generated_content,
            posts,
            sync_status,
            fingerprints,
            gateway,
            events,
            config,
        }
    }

    /// `syncPosts(account_id)`. Runs the whole reconciliation
    /// synchronously and returns the sync's terminal state. Prefer
    /// [`Self::start`] + [`Self::run`] when the caller wants the single-
    /// flight acquisition to happen synchronously but the matching work
    /// itself to run in the background.
    #[tracing::instrument(skip(self), fields(account_id = %account_id))]
    pub async fn sync(&self, account_id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        let sync = self.start(account_id).await?;
        self.run(account_id, sync).await
    }

    /// Acquires single-flight and publishes `sync_started`; returns `Busy`
    /// synchronously if another sync is already active. Split out of
    /// [`Self::sync`] so the HTTP handler can await just this part before
    /// spawning [`Self::run`].
    #[tracing::instrument(skip(self), fields(account_id = %account_id))]
    pub async fn start(&self, account_id: Uuid) -> Result<AccountSyncStatus, PipelineError> {
        self.accounts
            .get(account_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("account {account_id}")))?;

        let total_to_process = self.generated_content.list_unposted_video(account_id).await?.len() as i32;

        let sync = self.sync_status.acquire_sync(account_id, total_to_process).await?;
        self.events.publish_sync_started(&sync);
        Ok(sync)
    }

    /// Runs the matching work for a sync already acquired by [`Self::start`]
    /// and drives it to completion.
    #[tracing::instrument(skip(self, sync), fields(account_id = %account_id, sync_id = %sync.id))]
    pub async fn run(
        &self,
        account_id: Uuid,
        sync: AccountSyncStatus,
    ) -> Result<AccountSyncStatus, PipelineError> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("account {account_id}")))?;

        let unposted = self.generated_content.list_unposted_video(account_id).await?;

        if unposted.is_empty() {
            let completed = self.sync_status.complete(sync.id).await?;
            self.events.publish_sync_updated(&completed);
            return Ok(completed);
        }

        let mut candidates = Vec::with_capacity(unposted.len());
        for gc in unposted {
            let files = self.generated_content.files(gc.id).await?;
            let Some(file) = files.into_iter().next() else {
                continue;
            };
            let video_url = format!("blob://{}", file.file_id);
            let fingerprint = self.fingerprints.fingerprint(&video_url).await?;
            candidates.push(Candidate {
                content: gc,
                file,
                fingerprint,
            });
            self.pace().await;
        }

        // step 3: `min(candidates * 3, 50)`, floor 15.
        let fetch_n = (candidates.len() * self.config.post_fetch_multiplier)
            .clamp(self.config.post_fetch_floor, self.config.post_fetch_ceiling);

        let platform = account.platform.to_string();
        let reels = self
            .gateway
            .get_user_reels(&platform, &account.username, fetch_n)
            .await
            .map_err(PipelineError::from)?;

        let mut matched = Vec::new();
        for reel in reels {
            if !reel.is_video {
                continue;
            }
            let Some(video_url) = &reel.video_url else {
                continue;
            };
            if self.posts.get_by_url(&reel.url).await?.is_some() {
                continue;
            }

            self.pace().await;
            let post_fingerprint = self.fingerprints.fingerprint(video_url).await?;

            let best = candidates
                .iter()
                .enumerate()
                .map(|(idx, c)| (idx, repurposer_core::fingerprint_similarity(&c.fingerprint, &post_fingerprint)))
                .filter(|(_, score)| *score >= self.config.fingerprint_similarity_threshold)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            if let Some((idx, _score)) = best {
                let candidate = candidates.remove(idx);
                matched.push((candidate, reel.url.clone(), reel.view_count));
            }
        }

        for (candidate, url, view_count) in matched {
            self.sync_status.increment_processed(sync.id, 1).await?;
            let result = self
                .posts
                .post_content(
                    &platform,
                    &url,
                    account_id,
                    candidate.file.thumbnail_id,
                    Some(candidate.content.content_id),
                    Some(candidate.content.id),
                    Some(candidate.content.content_account_id),
                    true,
                    view_count,
                )
                .await;
            match result {
                Ok(_) => {
                    self.sync_status.increment_synced(sync.id, 1).await?;
                }
                Err(e) => {
                    tracing::warn!(account_id = %account_id, url, error = %e, "failed to record matched post");
                    self.sync_status.increment_failed(sync.id, 1).await?;
                }
            }
        }

        // step 5: every candidate left unmatched after the full scan is
        // counted processed-and-failed.
        if !candidates.is_empty() {
            let remaining = candidates.len() as i32;
            self.sync_status.increment_processed(sync.id, remaining).await?;
            self.sync_status.increment_failed(sync.id, remaining).await?;
        }

        let completed = self.sync_status.complete(sync.id).await?;
        self.events.publish_sync_updated(&completed);
        Ok(completed)
    }

    /// Small randomized delay between outbound calls, so a sync doesn't
    /// hammer the fingerprint engine or the social gateway back to back.
    async fn pace(&self) {
        let millis = rand::rng().random_range(self.config.sync_pacing_min_ms..=self.config.sync_pacing_max_ms);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
