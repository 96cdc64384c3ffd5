//! The polling loop driving feed ingestion.
//!
//! One feed per tick: the scheduler picks the feed with the oldest (or null)
//! `last_fetched_at`, stamps it fetched, and runs the
//! fetch→parse→normalize→write pipeline for it. With N feeds and one shared
//! interval this approximates round-robin polling, and because the stamp
//! lands before the fetch, a broken feed cannot starve the others — it waits
//! until every other feed has had a turn.
//!
//! Nothing below the loop is fatal to it: every tick-level failure is logged
//! and the next tick proceeds. The loop itself only returns on a startup
//! error (non-positive interval).

use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::config::ConfigError;
use crate::feed::{fetch_document, normalize, parse_document, FetchError, ParseError};
use crate::storage::{Database, DatabaseError, Feed, InsertOutcome};

/// A tick-terminal failure. The scheduler reports it and moves on.
#[derive(Debug, Error)]
pub enum TickError {
    /// The registry has no feeds to poll
    #[error("no feeds registered")]
    NoFeeds,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// What one tick accomplished
#[derive(Debug)]
pub struct TickSummary {
    pub feed_id: i64,
    pub feed_name: String,
    pub inserted: usize,
    pub already_known: usize,
    pub failed: usize,
}

/// Run the aggregation loop forever.
///
/// Strict periodic cadence: a slow cycle delays the next tick rather than
/// letting ticks pile up. Only a non-positive interval is fatal; every
/// in-flight failure is confined to its tick.
pub async fn run_loop(
    db: &Database,
    client: &reqwest::Client,
    every: Duration,
) -> Result<(), ConfigError> {
    if every.is_zero() {
        return Err(ConfigError::InvalidInterval);
    }

    tracing::info!(interval_secs = every.as_secs(), "Collecting feeds");

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match run_tick(db, client).await {
            Ok(summary) => {
                tracing::info!(
                    feed = %summary.feed_name,
                    inserted = summary.inserted,
                    already_known = summary.already_known,
                    failed = summary.failed,
                    "Tick complete"
                );
            }
            Err(TickError::NoFeeds) => {
                tracing::warn!("No feeds registered, nothing to fetch");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tick failed");
            }
        }
    }
}

/// One unit of scheduler work, invokable synchronously in tests.
///
/// Selects the next feed, stamps it fetched (before the fetch, so a failing
/// feed is not retried until its turn comes back around), then ingests the
/// document item by item.
pub async fn run_tick(db: &Database, client: &reqwest::Client) -> Result<TickSummary, TickError> {
    let feed = db.next_feed_to_fetch().await?.ok_or(TickError::NoFeeds)?;

    db.mark_feed_fetched(feed.id, chrono::Utc::now()).await?;

    let bytes = fetch_document(client, &feed.url).await?;
    let document = parse_document(&bytes)?;

    tracing::debug!(
        feed = %feed.name,
        channel = %document.channel.title,
        items = document.channel.items.len(),
        "Fetched feed document"
    );

    Ok(ingest_items(db, &feed, document.channel.items).await)
}

/// Write each item's candidate post, classifying outcomes.
///
/// `AlreadyExists` is the expected steady state once a feed has been polled
/// more than once. A store failure on one item never aborts the rest of the
/// batch.
async fn ingest_items(
    db: &Database,
    feed: &Feed,
    items: Vec<crate::feed::RawItem>,
) -> TickSummary {
    let mut summary = TickSummary {
        feed_id: feed.id,
        feed_name: feed.name.clone(),
        inserted: 0,
        already_known: 0,
        failed: 0,
    };

    for item in items {
        let candidate = normalize(item, feed.id);
        match db.create_post(&candidate).await {
            Ok(InsertOutcome::Inserted) => {
                summary.inserted += 1;
                tracing::info!(
                    title = candidate.title.as_deref().unwrap_or("<untitled>"),
                    link = candidate.url.as_deref().unwrap_or(""),
                    description = candidate.description.as_deref().unwrap_or(""),
                    published_at = %candidate.published_at,
                    "Stored new post"
                );
            }
            Ok(InsertOutcome::AlreadyExists) => {
                summary.already_known += 1;
                tracing::debug!(
                    link = candidate.url.as_deref().unwrap_or(""),
                    "Post already stored, skipping"
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    title = candidate.title.as_deref().unwrap_or("<untitled>"),
                    error = %e,
                    "Failed to store post"
                );
            }
        }
    }

    summary
}
