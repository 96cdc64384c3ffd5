use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A feed with the same URL is already registered
    #[error("a feed with that URL is already registered")]
    FeedExists,

    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Other(#[from] sqlx::Error),
}

// ============================================================================
// Row Types
// ============================================================================

/// A registered syndication source.
///
/// Rows are created and removed by the registry commands; the ingestion core
/// only ever stamps `last_fetched_at`/`updated_at`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Unix timestamp of the last poll; `None` until first fetched
    pub last_fetched_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A stored post. Created exactly once per distinct URL, never updated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A normalized, not-yet-persisted post derived from one feed item.
#[derive(Debug, Clone)]
pub struct CandidatePost {
    pub feed_id: i64,
    /// `None` if the unescaped title was empty
    pub title: Option<String>,
    /// `None` if the item carried no link
    pub url: Option<String>,
    /// `None` if the unescaped description was empty
    pub description: Option<String>,
    /// Parsed `pubDate`, or the ingestion wall-clock time when unparseable
    pub published_at: DateTime<Utc>,
}

/// Outcome of a post insert.
///
/// A unique-URL conflict is the expected steady state once a feed has been
/// polled more than once, so it is a variant here rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}
