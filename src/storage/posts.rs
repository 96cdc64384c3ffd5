use chrono::Utc;

use super::schema::Database;
use super::types::{CandidatePost, DatabaseError, InsertOutcome, Post};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Attempt to persist a candidate post.
    ///
    /// A unique-violation on the post URL means the post is already known and
    /// is reported as `InsertOutcome::AlreadyExists`, not an error. The store
    /// classifies the conflict here so callers branch on an explicit
    /// discriminant instead of inspecting error internals.
    pub async fn create_post(
        &self,
        candidate: &CandidatePost,
    ) -> Result<InsertOutcome, DatabaseError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(candidate.feed_id)
        .bind(&candidate.title)
        .bind(&candidate.url)
        .bind(&candidate.description)
        .bind(candidate.published_at.timestamp())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(DatabaseError::Other(e)),
        }
    }

    /// The most recently published posts across all feeds
    pub async fn recent_posts(&self, limit: u32) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            ORDER BY published_at DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// All posts belonging to one feed, newest first
    pub async fn posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
