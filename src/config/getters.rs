//! Read accessors for `CrawlConfig`.

use std::path::{Path, PathBuf};

use super::types::{CrawlConfig, CrawlMode};

impl CrawlConfig {
    #[must_use]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    #[must_use]
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    #[must_use]
    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    #[must_use]
    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn cookies_path(&self) -> Option<&PathBuf> {
        self.cookies_path.as_ref()
    }

    #[must_use]
    pub fn use_external_downloader(&self) -> bool {
        self.use_external_downloader
    }

    #[must_use]
    pub fn external_downloader_program(&self) -> &str {
        &self.external_downloader_program
    }

    #[must_use]
    pub fn alt_view_host(&self) -> &str {
        &self.alt_view_host
    }

    #[must_use]
    pub fn max_scrolls(&self) -> u32 {
        self.max_scrolls
    }

    #[must_use]
    pub fn min_posts(&self) -> Option<usize> {
        self.min_posts
    }

    #[must_use]
    pub fn comment_budget_secs(&self) -> u64 {
        self.comment_budget_secs
    }
}
