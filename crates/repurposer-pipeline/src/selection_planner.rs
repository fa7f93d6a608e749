//! Selection Planner.
//!
//! Reserves one `ContentAccount` at a time, in the order the per-type
//! strategy names them, so that each reservation is visible to the next
//! selection query within the same `plan` call. Reservation is two counter
//! writes in one transaction (`ContentAccountRepository::reserve`); a
//! candidate that can't be reserved (lost the `FOR UPDATE SKIP LOCKED` race)
//! is simply skipped in favor of the next one the strategy offers.

use rand::Rng;
use repurposer_core::models::{Account, ContentType};
use repurposer_core::PipelineConfig;
use repurposer_core::PipelineError;
use repurposer_db::ContentAccountRepository;
use uuid::Uuid;

/// One reserved source item. `content_id` travels alongside because the
/// dispatcher needs it immediately to resolve `Content` + `ContentFiles`.
#[derive(Debug, Clone, Copy)]
pub struct PlannedSelection {
    pub content_account_id: Uuid,
    pub content_id: Uuid,
}

#[derive(Clone)]
pub struct SelectionPlanner {
    content_accounts: ContentAccountRepository,
    config: PipelineConfig,
}

impl SelectionPlanner {
    pub fn new(content_accounts: ContentAccountRepository, config: PipelineConfig) -> Self {
        Self {
            content_accounts,
            config,
        }
    }

    /// Preconditions enforced before planning: platform support and
    /// per-type posting-goal headroom. Pure validation, no reservation.
    pub async fn check_preconditions(
        &self,
        account: &Account,
        content_type: ContentType,
        quantity: i32,
    ) -> Result<(), PipelineError> {
        if !account.platform.is_supported() {
            return Err(PipelineError::UnsupportedPlatform(format!(
                "platform {} is not supported",
                account.platform
            )));
        }
        let posting_goal = account.posting_goal_for(content_type);
        if posting_goal > 0 {
            let existing = self
                .content_accounts
                .count_generated(account.id, content_type)
                .await?;
            if existing + quantity as i64 > posting_goal as i64 {
                return Err(PipelineError::LimitExceeded(format!(
                    "account {} would exceed its {} posting goal of {}",
                    account.id, content_type, posting_goal
                )));
            }
        }
        Ok(())
    }

    /// `plan(account, request{type, quantity}) -> ordered list of reserved
    /// ContentAccount ids`. Returns fewer than `quantity` items when
    /// the strategy runs out of eligible candidates ("Partial availability");
    /// never errors on partial availability, only on a precondition failure.
    pub async fn plan(
        &self,
        account: &Account,
        content_type: ContentType,
        quantity: i32,
    ) -> Result<Vec<PlannedSelection>, PipelineError> {
        self.check_preconditions(account, content_type, quantity).await?;

        let mut reserved = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let candidate = match content_type {
                ContentType::Video => self.select_video_candidate(account).await?,
                ContentType::Story => self.select_story_candidate(account).await?,
                ContentType::Slideshow => self.select_slideshow_candidate(account).await?,
                ContentType::Image => {
                    return Err(PipelineError::UnsupportedType(format!(
                        "{content_type} has no selection strategy"
                    )));
                }
            };

            let Some((content_account_id, content_id)) = candidate else {
                break;
            };

            reserved.push(PlannedSelection {
                content_account_id,
                content_id,
            });
        }

        Ok(reserved)
    }

    /// *Video* strategy. `main` accounts and TikTok pick by least
    /// `times_generated`; everyone else splits 0.6/0.4 between preferring
    /// never-generated items (falling back to "popular recent", itself
    /// falling back to least-recently-generated) and going straight to least-
    /// recently-generated.
    async fn select_video_candidate(
        &self,
        account: &Account,
    ) -> Result<Option<(Uuid, Uuid)>, PipelineError> {
        let mut tx = self.content_accounts.pool().begin().await?;

        if account.role.is_main() || matches!(account.platform, repurposer_core::models::Platform::TikTok) {
            let candidate = self
                .content_accounts
                .lock_least_generated_video_candidate(
                    &mut tx,
                    account.id,
                    self.config.video_reuse_window_generations,
                )
                .await?;
            return self.reserve_and_commit(tx, candidate).await;
        }

        let prefer_never_generated = rand::rng().random_bool(self.config.video_never_generated_probability);

        if prefer_never_generated {
            if let Some(candidate) = self
                .content_accounts
                .lock_never_generated_candidate(&mut tx, account.id)
                .await?
            {
                return self.reserve_and_commit(tx, Some(candidate)).await;
            }
            tx.rollback().await.ok();

            if let Some(candidate) = self.select_popular_recent_candidate(account).await? {
                let tx = self.content_accounts.pool().begin().await?;
                return self.reserve_and_commit(tx, Some(candidate)).await;
            }

            let mut tx = self.content_accounts.pool().begin().await?;
            let candidate = self
                .content_accounts
                .lock_least_recently_generated_candidate(&mut tx, account.id)
                .await?;
            return self.reserve_and_commit(tx, candidate).await;
        }

        let candidate = self
            .content_accounts
            .lock_least_recently_generated_candidate(&mut tx, account.id)
            .await?;
        self.reserve_and_commit(tx, candidate).await
    }

    /// "Popular recent" pool: top N ContentAccounts by trailing-
    /// window view totals; falls back to `None` (letting the caller try
    /// least-recently-generated) when fewer than the configured minimum pool
    /// size is available.
    async fn select_popular_recent_candidate(
        &self,
        account: &Account,
    ) -> Result<Option<repurposer_core::models::ContentAccount>, PipelineError> {
        let pool = self
            .content_accounts
            .popular_recent_pool(
                account.id,
                self.config.video_popular_recent_window_days,
                self.config.video_popular_recent_top_n as i64,
            )
            .await?;

        if pool.len() < self.config.video_popular_recent_min_pool {
            return Ok(None);
        }

        // Tie-break already applied by the query's ORDER BY (views desc,
        // null last_generated_at first, then earliest); the first row is
        // the pick.
        Ok(pool.into_iter().next())
    }

    /// *Story* strategy: next eligible in deterministic sequence,
    /// no reuse limit.
    async fn select_story_candidate(&self, account: &Account) -> Result<Option<(Uuid, Uuid)>, PipelineError> {
        let mut tx = self.content_accounts.pool().begin().await?;
        let candidate = self
            .content_accounts
            .lock_next_sequential_candidate(&mut tx, account.id, None)
            .await?;
        self.reserve_and_commit(tx, candidate).await
    }

    /// *Slideshow* strategy: like story, but `main` accounts get the
    /// same `times_generated < 2` cap as the video reuse window.
    async fn select_slideshow_candidate(
        &self,
        account: &Account,
    ) -> Result<Option<(Uuid, Uuid)>, PipelineError> {
        let reuse_cap = account
            .role
            .is_main()
            .then_some(self.config.video_reuse_window_generations);
        let mut tx = self.content_accounts.pool().begin().await?;
        let candidate = self
            .content_accounts
            .lock_next_sequential_candidate(&mut tx, account.id, reuse_cap)
            .await?;
        self.reserve_and_commit(tx, candidate).await
    }

    async fn reserve_and_commit(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
        candidate: Option<repurposer_core::models::ContentAccount>,
    ) -> Result<Option<(Uuid, Uuid)>, PipelineError> {
        let Some(candidate) = candidate else {
            tx.rollback().await.ok();
            return Ok(None);
        };
        self.content_accounts
            .reserve(&mut tx, candidate.id, candidate.content_id)
            .await?;
        tx.commit().await?;
        Ok(Some((candidate.id, candidate.content_id)))
    }

    /// Saturating rollback of a reservation that was never dispatched
    pub async fn rollback(&self, content_account_id: Uuid, content_id: Uuid) -> Result<(), PipelineError> {
        self.content_accounts
            .rollback_reservation(content_account_id, content_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planned_selection_is_copy_and_cheap_to_pass_around() {
        let a = PlannedSelection {
            content_account_id: Uuid::new_v4(),
            content_id: Uuid::new_v4(),
        };
        let b = a;
        assert_eq!(a.content_account_id, b.content_account_id);
    }
}
