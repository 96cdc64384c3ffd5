use chrono::{DateTime, Utc};

use super::schema::Database;
use super::types::{DatabaseError, Feed};

impl Database {
    // ========================================================================
    // Feed Registry Operations
    // ========================================================================

    /// Register a feed. Returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::FeedExists` if a feed with the same URL is
    /// already registered.
    pub async fn insert_feed(&self, name: &str, url: &str) -> Result<Feed, DatabaseError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (name, url, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, url, last_fetched_at, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(feed) => Ok(feed),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DatabaseError::FeedExists)
            }
            Err(e) => Err(DatabaseError::Other(e)),
        }
    }

    /// All registered feeds in registration order
    pub async fn all_feeds(&self) -> Result<Vec<Feed>, DatabaseError> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, last_fetched_at, created_at, updated_at
            FROM feeds
            ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Look up a feed by its URL
    pub async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, last_fetched_at, created_at, updated_at
            FROM feeds
            WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Unregister a feed; its posts cascade-delete. Returns true if a row
    /// was removed.
    pub async fn remove_feed(&self, url: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feeds WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Scheduler Operations
    // ========================================================================

    /// The next feed the scheduler should poll: never-fetched feeds first,
    /// then the least recently fetched, with feed id as a stable tie-break.
    ///
    /// Returns `None` when the registry is empty.
    pub async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, last_fetched_at, created_at, updated_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Stamp a feed's `last_fetched_at` and bump `updated_at`.
    ///
    /// The scheduler calls this before the fetch, so a broken feed waits for
    /// its turn to come back around instead of being retried every tick.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let ts = fetched_at.timestamp();
        sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(ts)
            .bind(ts)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
