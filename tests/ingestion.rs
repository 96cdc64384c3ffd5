//! End-to-end ingestion tests: a wiremock HTTP server stands in for the
//! remote feed, an in-memory SQLite database for the store, and the
//! scheduler's `run_tick` is invoked synchronously — no wall-clock waits.

use chrono::Utc;
use gleaner::feed::http_client;
use gleaner::scheduler::{run_tick, TickError};
use gleaner::storage::{CandidatePost, Database, InsertOutcome};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

async fn mount_rss(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

const SCENARIO_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example &amp; Co</title>
    <link>https://example.com</link>
    <description>News</description>
    <item>
      <title>Hi &amp; Bye</title>
      <link>https://example.com/1</link>
      <description>Greetings</description>
      <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    </item>
  </channel>
</rss>"#;

#[tokio::test]
async fn test_scenario_single_item_ingested() {
    let server = MockServer::start().await;
    mount_rss(&server, "/rss", SCENARIO_RSS).await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Example", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    let before = Utc::now().timestamp();
    let summary = run_tick(&db, &http_client().unwrap()).await.unwrap();
    let after = Utc::now().timestamp();

    assert_eq!(summary.feed_id, feed.id);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.already_known, 0);
    assert_eq!(summary.failed, 0);

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title.as_deref(), Some("Hi & Bye"));
    assert_eq!(posts[0].url.as_deref(), Some("https://example.com/1"));
    // 2006-01-02T15:04:05-07:00
    assert_eq!(posts[0].published_at, Some(1_136_239_445));

    // Feed stamped with the tick's start time
    let stamped = db
        .feed_by_url(&feed.url)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .unwrap();
    assert!(stamped >= before && stamped <= after);
}

#[tokio::test]
async fn test_second_tick_is_idempotent() {
    let server = MockServer::start().await;
    mount_rss(&server, "/rss", SCENARIO_RSS).await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Example", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    let client = http_client().unwrap();
    let first = run_tick(&db, &client).await.unwrap();
    let second = run_tick(&db, &client).await.unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_known, 1);

    // Exactly one stored post, never a duplicate row
    assert_eq!(db.posts_for_feed(feed.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fairness_never_fetched_feed_goes_first() {
    let server = MockServer::start().await;
    mount_rss(&server, "/a", SCENARIO_RSS).await;
    mount_rss(&server, "/b", SCENARIO_RSS).await;

    let db = test_db().await;
    let a = db
        .insert_feed("A", &format!("{}/a", server.uri()))
        .await
        .unwrap();
    let b = db
        .insert_feed("B", &format!("{}/b", server.uri()))
        .await
        .unwrap();
    db.mark_feed_fetched(b.id, Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();

    let summary = run_tick(&db, &http_client().unwrap()).await.unwrap();
    assert_eq!(summary.feed_id, a.id);

    let a_fetched = db
        .feed_by_url(&a.url)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .unwrap();
    let b_fetched = db
        .feed_by_url(&b.url)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .unwrap();
    assert!(a_fetched >= b_fetched);
}

#[tokio::test]
async fn test_ticks_alternate_between_feeds() {
    let server = MockServer::start().await;
    mount_rss(&server, "/a", SCENARIO_RSS).await;
    mount_rss(&server, "/b", SCENARIO_RSS).await;

    let db = test_db().await;
    let a = db
        .insert_feed("A", &format!("{}/a", server.uri()))
        .await
        .unwrap();
    let b = db
        .insert_feed("B", &format!("{}/b", server.uri()))
        .await
        .unwrap();

    let client = http_client().unwrap();
    let first = run_tick(&db, &client).await.unwrap();
    let second = run_tick(&db, &client).await.unwrap();

    assert_eq!(first.feed_id, a.id);
    assert_eq!(second.feed_id, b.id);
}

#[tokio::test]
async fn test_empty_registry_reports_no_feeds() {
    let db = test_db().await;
    let err = run_tick(&db, &http_client().unwrap()).await.unwrap_err();
    assert!(matches!(err, TickError::NoFeeds));
}

#[tokio::test]
async fn test_fetch_failure_still_stamps_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Broken", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    let err = run_tick(&db, &http_client().unwrap()).await.unwrap_err();
    assert!(matches!(err, TickError::Fetch(_)));

    // The stamp lands before the fetch, so the broken feed has lost its
    // turn and will not starve other feeds
    let stamped = db.feed_by_url(&feed.url).await.unwrap().unwrap();
    assert!(stamped.last_fetched_at.is_some());
    assert!(db.posts_for_feed(feed.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_document_is_tick_error_not_fatal() {
    let server = MockServer::start().await;
    mount_rss(&server, "/rss", "<rss><channel><item></rss").await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Mangled", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    let err = run_tick(&db, &http_client().unwrap()).await.unwrap_err();
    assert!(matches!(err, TickError::Parse(_)));
    assert!(db.posts_for_feed(feed.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_continues_past_known_post() {
    let rss = r#"<rss version="2.0"><channel><title>T</title>
      <item><title>One</title><link>https://example.com/1</link></item>
      <item><title>Two</title><link>https://example.com/2</link></item>
      <item><title>Three</title><link>https://example.com/3</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_rss(&server, "/rss", rss).await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Example", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    // The middle item is already known before the tick runs
    let outcome = db
        .create_post(&CandidatePost {
            feed_id: feed.id,
            title: Some("Two".to_string()),
            url: Some("https://example.com/2".to_string()),
            description: None,
            published_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, InsertOutcome::Inserted);

    let summary = run_tick(&db, &http_client().unwrap()).await.unwrap();
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.already_known, 1);
    assert_eq!(summary.failed, 0);

    // Items 1 and 3 made it in despite the mid-batch conflict
    assert_eq!(db.posts_for_feed(feed.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unparseable_pub_date_stored_as_now() {
    let rss = r#"<rss version="2.0"><channel><title>T</title>
      <item><title>One</title><link>https://example.com/1</link>
        <pubDate>yesterday-ish</pubDate></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_rss(&server, "/rss", rss).await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Example", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    let before = Utc::now().timestamp();
    run_tick(&db, &http_client().unwrap()).await.unwrap();
    let after = Utc::now().timestamp();

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    let published = posts[0].published_at.expect("fallback is a real timestamp");
    assert!(published >= before && published <= after);
}

#[tokio::test]
async fn test_empty_title_stored_as_absent() {
    let rss = r#"<rss version="2.0"><channel><title>T</title>
      <item><title></title><link>https://example.com/1</link></item>
    </channel></rss>"#;

    let server = MockServer::start().await;
    mount_rss(&server, "/rss", rss).await;

    let db = test_db().await;
    let feed = db
        .insert_feed("Example", &format!("{}/rss", server.uri()))
        .await
        .unwrap();

    run_tick(&db, &http_client().unwrap()).await.unwrap();

    let posts = db.posts_for_feed(feed.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].title.is_none(), "empty title must be NULL, not \"\"");
}
