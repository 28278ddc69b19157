use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::story::{NewStory, Story, StoryChanges, StoryWithOwner};
use crate::database::models::user::User;

/// Which stories a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryScope {
    All,
    OwnedBy(i64),
}

impl StoryScope {
    fn owner(self) -> Option<i64> {
        match self {
            StoryScope::All => None,
            StoryScope::OwnedBy(id) => Some(id),
        }
    }
}

/// Persistence seam for stories and their owners
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    /// Story plus its owner's public fields, or `None` when the id is unknown
    async fn find_with_owner(&self, id: i64) -> Result<Option<StoryWithOwner>, DatabaseError>;

    /// Newest first (`created_at DESC, id DESC`)
    async fn latest(&self, scope: StoryScope, limit: i64, offset: i64) -> Result<Vec<StoryWithOwner>, DatabaseError>;

    async fn count(&self, scope: StoryScope) -> Result<i64, DatabaseError>;

    async fn insert(&self, new_story: NewStory) -> Result<Story, DatabaseError>;

    async fn update(&self, id: i64, changes: StoryChanges) -> Result<Story, DatabaseError>;

    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
}

const SELECT_WITH_OWNER: &str = r#"
    SELECT
        s.id, s.user_id, s.title, s.content, s.image, s.created_at, s.updated_at,
        u.id AS owner_id, u.name AS owner_name, u.email AS owner_email,
        u.created_at AS owner_created_at, u.updated_at AS owner_updated_at
    FROM stories s
    JOIN users u ON u.id = s.user_id
"#;

/// PostgreSQL-backed story store
#[derive(Clone)]
pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user row. Users are owned by an external system; this exists for operators.
    pub async fn insert_user(&self, name: &str, email: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email) VALUES ($1, $2)
             RETURNING id, name, email, created_at, updated_at",
        )
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_with_owner(&self, id: i64) -> Result<Option<StoryWithOwner>, DatabaseError> {
        let sql = format!("{} WHERE s.id = $1", SELECT_WITH_OWNER);
        let row = sqlx::query_as::<_, StoryWithOwner>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn latest(&self, scope: StoryScope, limit: i64, offset: i64) -> Result<Vec<StoryWithOwner>, DatabaseError> {
        let sql = format!(
            "{} WHERE ($1::BIGINT IS NULL OR s.user_id = $1)
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT $2 OFFSET $3",
            SELECT_WITH_OWNER
        );
        let rows = sqlx::query_as::<_, StoryWithOwner>(&sql)
            .bind(scope.owner())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, scope: StoryScope) -> Result<i64, DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stories WHERE ($1::BIGINT IS NULL OR user_id = $1)",
        )
        .bind(scope.owner())
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn insert(&self, new_story: NewStory) -> Result<Story, DatabaseError> {
        let story = sqlx::query_as::<_, Story>(
            "INSERT INTO stories (user_id, title, content, image)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, title, content, image, created_at, updated_at",
        )
        .bind(new_story.user_id)
        .bind(&new_story.title)
        .bind(&new_story.content)
        .bind(&new_story.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(story)
    }

    async fn update(&self, id: i64, changes: StoryChanges) -> Result<Story, DatabaseError> {
        let story = sqlx::query_as::<_, Story>(
            "UPDATE stories
             SET title = $2, content = $3, image = COALESCE($4, image), updated_at = now()
             WHERE id = $1
             RETURNING id, user_id, title, content, image, created_at, updated_at",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.image)
        .fetch_optional(&self.pool)
        .await?;
        story.ok_or_else(|| DatabaseError::NotFound(format!("Story {} not found", id)))
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Story {} not found", id)));
        }
        Ok(())
    }
}
