use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use super::user::User;
use crate::storage::PUBLIC_PREFIX;

/// A persisted story row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Story {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    /// Path relative to the public disk root, e.g. `stories/<name>.jpg`
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Story {
    pub fn image_url(&self, public_base: &str) -> Option<String> {
        image_url(self.image.as_deref(), public_base)
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// `<public-base>/storage/<image>`, or `None` when there is no image
pub fn image_url(image: Option<&str>, public_base: &str) -> Option<String> {
    image.map(|path| {
        format!(
            "{}/{}/{}",
            public_base.trim_end_matches('/'),
            PUBLIC_PREFIX,
            path.trim_start_matches('/')
        )
    })
}

/// A story with its owner eagerly joined
#[derive(Debug, Clone, PartialEq)]
pub struct StoryWithOwner {
    pub story: Story,
    pub user: User,
}

impl<'r> FromRow<'r, PgRow> for StoryWithOwner {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            story: Story {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                title: row.try_get("title")?,
                content: row.try_get("content")?,
                image: row.try_get("image")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            },
            user: User {
                id: row.try_get("owner_id")?,
                name: row.try_get("owner_name")?,
                email: row.try_get("owner_email")?,
                created_at: row.try_get("owner_created_at")?,
                updated_at: row.try_get("owner_updated_at")?,
            },
        })
    }
}

/// Values for a story insert; `user_id` is always the authenticated caller
#[derive(Debug, Clone)]
pub struct NewStory {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

/// Values for an owner update. Title and content are always overwritten;
/// `image` replaces the stored path only when `Some`.
#[derive(Debug, Clone)]
pub struct StoryChanges {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

/// JSON shape of a story, with the derived image URL and optional owner
#[derive(Debug, Clone, Serialize)]
pub struct StoryResource {
    #[serde(flatten)]
    pub story: Story,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl StoryResource {
    pub fn new(story: Story, public_base: &str) -> Self {
        let image_url = story.image_url(public_base);
        Self {
            story,
            image_url,
            user: None,
        }
    }

    pub fn with_owner(loaded: StoryWithOwner, public_base: &str) -> Self {
        Self {
            user: Some(loaded.user),
            ..Self::new(loaded.story, public_base)
        }
    }
}
