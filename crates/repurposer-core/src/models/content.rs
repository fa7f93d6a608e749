use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// The variant tag driving the `SelectContent`/`GenerateContent` split. The
/// dispatcher decides submit-to-queue vs. execute-inline by this tag, not by
/// a subtype hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Video,
    Story,
    Slideshow,
    Image,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContentType::Video => write!(f, "video"),
            ContentType::Story => write!(f, "story"),
            ContentType::Slideshow => write!(f, "slideshow"),
            ContentType::Image => write!(f, "image"),
        }
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ContentType::Video),
            "story" => Ok(ContentType::Story),
            "slideshow" => Ok(ContentType::Slideshow),
            "image" => Ok(ContentType::Image),
            _ => Err(anyhow::anyhow!("invalid content type: {s}")),
        }
    }
}

impl ContentType {
    /// step 5: the planner only has strategies for these three; an `image`
    /// (or any other) request is rejected with `UnsupportedType`.
    pub fn has_generation_strategy(&self) -> bool {
        matches!(
            self,
            ContentType::Video | ContentType::Story | ContentType::Slideshow
        )
    }

    /// step 7: video is dispatched to the async task queue, story and
    /// slideshow execute inline under the same counter contract.
    pub fn is_async(&self) -> bool {
        matches!(self, ContentType::Video)
    }
}

/// A reusable source item belonging to a [`crate::models::Client`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Content {
    pub id: Uuid,
    pub client_id: Uuid,
    pub content_type: ContentType,
    pub enabled: bool,
    pub use_mirror: bool,
    pub use_overlays: bool,
    pub times_generated: i32,
    pub times_posted: i32,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One ordered binary belonging to a [`Content`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentFile {
    pub id: Uuid,
    pub content_id: Uuid,
    pub position: i32,
    pub file_id: i64,
    pub thumbnail_id: i64,
    pub etag: String,
}
