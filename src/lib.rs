pub mod cancel;
pub mod checkpoint;
pub mod config;
pub mod crawl;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod retry;
pub mod session;
pub mod storage;

pub use cancel::CancelToken;
pub use checkpoint::{CheckpointIndex, CheckpointStatus, required_artifacts, scan};
pub use config::{CrawlConfig, CrawlMode};
pub use crawl::{CrawlSummary, run_page};
pub use discovery::{DiscoveryConfig, DiscoveryReport, discover};
pub use downloader::{Downloader, ExternalDownloader, HttpDownloader};
pub use error::{ScrapeError, ScrapeResult};
pub use extractor::{ExtractionRecord, ExtractorConfig, ItemOutcome, extract_post};
pub use identity::{PostKind, PostLink, TextDeduper, dedupe_links, extract_post_id};
pub use session::{
    BrowserSessionProvider, Element, Session, SessionError, SessionPair, SessionProvider,
};

use std::sync::Arc;

use anyhow::Result;

/// Run one page end to end with browser-backed sessions and the configured
/// downloader, honoring the given cancellation token.
pub async fn crawl_with_cancel(config: CrawlConfig, cancel: CancelToken) -> Result<CrawlSummary> {
    let provider: Arc<dyn SessionProvider> = Arc::new(BrowserSessionProvider::new(
        config.headless(),
        config.cookies_path().cloned(),
    ));
    let downloader: Arc<dyn Downloader> = if config.use_external_downloader() {
        Arc::new(ExternalDownloader::new(
            config.external_downloader_program(),
        ))
    } else {
        Arc::new(HttpDownloader::new()?)
    };
    crawl::run_page(&config, provider, downloader, cancel).await
}

/// Run one page end to end without external cancellation.
pub async fn crawl(config: CrawlConfig) -> Result<CrawlSummary> {
    crawl_with_cancel(config, CancelToken::new()).await
}
