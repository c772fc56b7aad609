//! Type-safe builder for `CrawlConfig` using the typestate pattern.
//!
//! Required fields (storage root and feed URL) are enforced at compile time;
//! `build` is only reachable once both transitions have happened.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{CrawlConfig, CrawlMode};

// Type states for the builder
pub struct WithStorageRoot;
pub struct WithFeedUrl;

pub struct CrawlConfigBuilder<State = ()> {
    pub(crate) inner: CrawlConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            inner: CrawlConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Create a builder with a fluent interface.
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }
}

impl CrawlConfigBuilder<()> {
    pub fn storage_root(self, root: impl Into<PathBuf>) -> CrawlConfigBuilder<WithStorageRoot> {
        let mut inner = self.inner;
        inner.storage_root = root.into();
        CrawlConfigBuilder {
            inner,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<WithStorageRoot> {
    pub fn feed_url(self, url: impl Into<String>) -> CrawlConfigBuilder<WithFeedUrl> {
        let url = url.into();
        // Normalize: add https:// if no scheme is present
        let normalized = if url.starts_with("http://") || url.starts_with("https://") {
            url
        } else {
            format!("https://{url}")
        };
        let mut inner = self.inner;
        inner.feed_url = normalized;
        CrawlConfigBuilder {
            inner,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<WithFeedUrl> {
    pub fn build(self) -> Result<CrawlConfig> {
        let mut config = self.inner;
        if config.feed_url.is_empty() {
            return Err(anyhow!("feed_url is required"));
        }
        if config.page_name.is_empty() {
            config.page_name = derive_page_name(&config.feed_url)
                .ok_or_else(|| anyhow!("cannot derive a page name from {}", config.feed_url))?;
        }
        if config.scroll_min_px > config.scroll_max_px {
            return Err(anyhow!("scroll_min_px exceeds scroll_max_px"));
        }
        if config.delay_min_ms > config.delay_max_ms {
            return Err(anyhow!("delay_min_ms exceeds delay_max_ms"));
        }
        config.concurrency = config.concurrency.max(1);
        Ok(config)
    }
}

/// Trailing path segment of the feed URL, the same way the output folder
/// was named upstream.
fn derive_page_name(feed_url: &str) -> Option<String> {
    let trimmed = feed_url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next()?;
    if segment.is_empty() || segment.contains('.') {
        // A bare host has no usable segment.
        return None;
    }
    Some(segment.to_string())
}

// Optional setters, available at any state.
impl<State> CrawlConfigBuilder<State> {
    #[must_use]
    pub fn page_name(mut self, name: impl Into<String>) -> Self {
        self.inner.page_name = name.into();
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: CrawlMode) -> Self {
        self.inner.mode = mode;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.inner.concurrency = workers;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.inner.headless = headless;
        self
    }

    #[must_use]
    pub fn cookies_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.cookies_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn use_external_downloader(mut self, enabled: bool) -> Self {
        self.inner.use_external_downloader = enabled;
        self
    }

    #[must_use]
    pub fn external_downloader_program(mut self, program: impl Into<String>) -> Self {
        self.inner.external_downloader_program = program.into();
        self
    }

    #[must_use]
    pub fn alt_view_host(mut self, host: impl Into<String>) -> Self {
        self.inner.alt_view_host = host.into();
        self
    }

    #[must_use]
    pub fn max_scrolls(mut self, ceiling: u32) -> Self {
        self.inner.max_scrolls = ceiling;
        self
    }

    #[must_use]
    pub fn min_posts(mut self, target: Option<usize>) -> Self {
        self.inner.min_posts = target;
        self
    }

    #[must_use]
    pub fn plateau_threshold(mut self, iterations: u32) -> Self {
        self.inner.plateau_threshold = iterations;
        self
    }

    #[must_use]
    pub fn reload_every(mut self, scrolls: u32) -> Self {
        self.inner.reload_every = scrolls;
        self
    }

    #[must_use]
    pub fn stage_retries(mut self, retries: u32) -> Self {
        self.inner.stage_retries = retries;
        self
    }

    #[must_use]
    pub fn item_retries(mut self, retries: u32) -> Self {
        self.inner.item_retries = retries;
        self
    }

    #[must_use]
    pub fn comment_budget_secs(mut self, seconds: u64) -> Self {
        self.inner.comment_budget_secs = seconds;
        self
    }

    /// Randomized inter-action delay range used by discovery scrolls and
    /// comment loading.
    #[must_use]
    pub fn delay_range_ms(mut self, min: u64, max: u64) -> Self {
        self.inner.delay_min_ms = min;
        self.inner.delay_max_ms = max;
        self
    }

    /// Post-navigation settle delay range.
    #[must_use]
    pub fn settle_range_ms(mut self, min: u64, max: u64) -> Self {
        self.inner.settle_min_ms = min;
        self.inner.settle_max_ms = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_page_name_from_feed_url() {
        let config = CrawlConfig::builder()
            .storage_root("./data")
            .feed_url("https://www.example.com/somepage/")
            .build()
            .unwrap();
        assert_eq!(config.page_name(), "somepage");
    }

    #[test]
    fn normalizes_scheme_and_honors_overrides() {
        let config = CrawlConfig::builder()
            .storage_root("./data")
            .feed_url("example.com/otherpage")
            .page_name("custom")
            .mode(CrawlMode::Resume)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(config.feed_url(), "https://example.com/otherpage");
        assert_eq!(config.page_name(), "custom");
        assert_eq!(config.mode(), CrawlMode::Resume);
        // concurrency is clamped to at least one worker
        assert_eq!(config.concurrency(), 1);
    }
}
