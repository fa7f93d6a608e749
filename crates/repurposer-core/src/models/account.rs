use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// The social platforms the selection planner and post reconciler know how to
/// handle. Accounts on other platforms exist in the data model (they are
/// created externally) but are rejected with `UnsupportedPlatform` at
/// dispatch time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    TikTok,
    Other,
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::TikTok => write!(f, "tiktok"),
            Platform::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::TikTok),
            _ => Ok(Platform::Other),
        }
    }
}

impl Platform {
    /// the only platforms the planner supports.
    pub fn is_supported(&self) -> bool {
        crate::constants::SUPPORTED_PLATFORMS.contains(&self.to_string().as_str())
    }
}

/// `main` accounts never get a random text overlay and use a different video
/// selection strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Main,
    Backup,
}

impl Display for AccountRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccountRole::Main => write!(f, "main"),
            AccountRole::Backup => write!(f, "backup"),
        }
    }
}

impl FromStr for AccountRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(AccountRole::Main),
            "backup" => Ok(AccountRole::Backup),
            _ => Err(anyhow::anyhow!("invalid account role: {s}")),
        }
    }
}

impl AccountRole {
    pub fn is_main(&self) -> bool {
        matches!(self, AccountRole::Main)
    }
}

/// A managed social-media account. Owned by a [`crate::models::Client`]; per-
/// type posting goals bound how many `GeneratedContent` rows the dispatcher
/// is allowed to accumulate for that `(account, content_type)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub client_id: Uuid,
    pub username: String,
    pub platform: Platform,
    pub role: AccountRole,
    pub video_goal: i32,
    pub slideshow_goal: i32,
    pub story_goal: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The posting goal for a given content type, or `0` when the type has no
    /// meaningful goal on this account.
    pub fn posting_goal_for(&self, content_type: super::ContentType) -> i32 {
        match content_type {
            super::ContentType::Video => self.video_goal,
            super::ContentType::Slideshow => self.slideshow_goal,
            super::ContentType::Story => self.story_goal,
            super::ContentType::Image => 0,
        }
    }
}
