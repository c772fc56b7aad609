//! End-to-end mode pipeline behavior over scripted sessions: resume
//! filtering, rescan URL reconstruction, and summary accounting.

mod common;

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{FailingSession, FeedSession, StubDownloader};
use feedscrape::cancel::CancelToken;
use feedscrape::config::{CrawlConfig, CrawlMode};
use feedscrape::crawl::run_page;
use feedscrape::session::{SessionPair, SessionProvider, SessionResult};
use tempfile::TempDir;

/// First acquisition yields the scripted feed session (discovery); every
/// later acquisition yields a failing worker pair.
struct SequenceProvider {
    feed: Mutex<Option<Arc<FeedSession>>>,
}

impl SequenceProvider {
    fn new(feed: Arc<FeedSession>) -> Self {
        Self {
            feed: Mutex::new(Some(feed)),
        }
    }
}

#[async_trait]
impl SessionProvider for SequenceProvider {
    async fn acquire(&self) -> SessionResult<SessionPair> {
        if let Some(feed) = self.feed.lock().unwrap().take() {
            return Ok(SessionPair {
                primary: feed,
                alternate: Arc::new(FailingSession::new()),
            });
        }
        Ok(SessionPair {
            primary: Arc::new(FailingSession::new()),
            alternate: Arc::new(FailingSession::new()),
        })
    }
}

fn feed_hrefs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://example.com/somepage/posts/{}", 1_000 + i))
        .collect()
}

fn write(path: &Path, body: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn fast_config(storage_root: &Path, mode: CrawlMode) -> CrawlConfig {
    CrawlConfig::builder()
        .storage_root(storage_root)
        .mode(mode)
        .concurrency(2)
        .min_posts(Some(10))
        .max_scrolls(20)
        .stage_retries(1)
        .item_retries(1)
        .comment_budget_secs(1)
        .delay_range_ms(1, 2)
        .settle_range_ms(1, 2)
        .feed_url("https://example.com/somepage")
        .build()
        .unwrap()
}

#[tokio::test]
async fn resume_skips_ids_with_on_disk_evidence() {
    let tmp = TempDir::new().unwrap();
    let config = fast_config(tmp.path(), CrawlMode::Resume);

    // Three previously-seen ids: two complete, one incomplete. Resume skips
    // all three.
    let page_root = tmp.path().join("somepage");
    write(&page_root.join("1000").join("caption.txt"), b"caption\n");
    write(&page_root.join("1001").join("caption.txt"), b"caption\n");
    write(&page_root.join("1002").join("comments.txt"), b"comment\n");

    let feed = Arc::new(FeedSession::new(feed_hrefs(10), 10));
    let provider = Arc::new(SequenceProvider::new(feed));
    let summary = run_page(
        &config,
        provider,
        Arc::new(StubDownloader::failing()),
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.discovered, 10);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.processed, 7);
    let ids: Vec<&str> = summary.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert!(!ids.contains(&"1000"));
    assert!(!ids.contains(&"1001"));
    assert!(!ids.contains(&"1002"));
}

#[tokio::test]
async fn rescan_reprocesses_only_incomplete_ids_without_discovery() {
    let tmp = TempDir::new().unwrap();
    let config = fast_config(tmp.path(), CrawlMode::Rescan);

    let page_root = tmp.path().join("somepage");
    write(&page_root.join("1000").join("caption.txt"), b"caption\n");
    write(&page_root.join("1002").join("comments.txt"), b"comment\n");

    let feed = Arc::new(FeedSession::new(feed_hrefs(10), 10));
    let provider = Arc::new(SequenceProvider::new(Arc::clone(&feed)));
    let summary = run_page(
        &config,
        provider,
        Arc::new(StubDownloader::failing()),
        CancelToken::new(),
    )
    .await
    .unwrap();

    // Only the incomplete id is reprocessed, via a reconstructed URL.
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.outcomes[0].id, "1002");
    // Discovery never ran: no scroll command ever reached the feed session.
    assert_eq!(feed.scrolls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fresh_mode_processes_everything_discovered() {
    let tmp = TempDir::new().unwrap();
    let config = fast_config(tmp.path(), CrawlMode::Fresh);

    let feed = Arc::new(FeedSession::new(feed_hrefs(6), 10));
    let provider = Arc::new(SequenceProvider::new(feed));
    let summary = run_page(
        &config,
        provider,
        Arc::new(StubDownloader::failing()),
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.discovered, 6);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.processed, 6);
    assert_eq!(summary.failed, 6, "failing sessions produce no artifacts");
}
