//! Core configuration types for feed crawling.
//!
//! `CrawlConfig` is the single configuration surface the pipeline consumes:
//! feed URL, storage, mode, concurrency, discovery heuristics, and the
//! retry/timeout knobs threaded into discovery and extraction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a run treats already-persisted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Discover and process everything found.
    Fresh,
    /// Discover, then skip every ID with on-disk evidence.
    Resume,
    /// No discovery; reprocess only incomplete IDs from the checkpoint scan.
    Rescan,
}

/// Main configuration for one page run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Root under which page-scoped item directories live.
    ///
    /// The page subdirectory is derived from `page_name`, never configured
    /// directly.
    pub(crate) storage_root: PathBuf,
    /// Feed URL to discover from. Normalized to carry a scheme.
    pub(crate) feed_url: String,
    /// Directory name for this page's output. Defaults to the feed URL's
    /// trailing path segment.
    pub(crate) page_name: String,
    pub(crate) mode: CrawlMode,
    /// Parallel workers; each owns one exclusive session pair.
    pub(crate) concurrency: usize,
    pub(crate) headless: bool,
    /// JSON cookie file applied to every launched session.
    pub(crate) cookies_path: Option<PathBuf>,
    /// Route video downloads through an external program instead of the
    /// streaming HTTP client.
    pub(crate) use_external_downloader: bool,
    pub(crate) external_downloader_program: String,
    /// Host serving the lightweight alternate view; empty derives
    /// `m.<host>` per item.
    pub(crate) alt_view_host: String,

    // Discovery heuristics.
    /// Scroll ceiling; 0 means unbounded.
    pub(crate) max_scrolls: u32,
    pub(crate) min_posts: Option<usize>,
    pub(crate) plateau_threshold: u32,
    pub(crate) reload_every: u32,
    pub(crate) scroll_min_px: u64,
    pub(crate) scroll_max_px: u64,
    pub(crate) delay_min_ms: u64,
    pub(crate) delay_max_ms: u64,
    pub(crate) zoom_percent: u32,

    // Retry and timeout knobs.
    pub(crate) stage_retries: u32,
    pub(crate) item_retries: u32,
    pub(crate) retry_base_delay_ms: u64,
    pub(crate) type_probe_timeout_secs: u64,
    pub(crate) element_timeout_secs: u64,
    /// Whole-budget guard for comment loading, distinct from per-click
    /// waits.
    pub(crate) comment_budget_secs: u64,
    pub(crate) comment_no_growth_ceiling: u32,
    pub(crate) media_ready_attempts: u32,
    pub(crate) settle_min_ms: u64,
    pub(crate) settle_max_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./data"),
            feed_url: String::new(),
            page_name: String::new(),
            mode: CrawlMode::Fresh,
            concurrency: 2,
            headless: true,
            cookies_path: None,
            use_external_downloader: false,
            external_downloader_program: "yt-dlp".to_string(),
            alt_view_host: String::new(),
            max_scrolls: 1_000,
            min_posts: Some(100),
            plateau_threshold: 3,
            reload_every: 200,
            scroll_min_px: 300,
            scroll_max_px: 1_000,
            delay_min_ms: 500,
            delay_max_ms: 1_000,
            zoom_percent: 50,
            stage_retries: 3,
            item_retries: 3,
            retry_base_delay_ms: 1_000,
            type_probe_timeout_secs: 5,
            element_timeout_secs: 10,
            comment_budget_secs: 30,
            comment_no_growth_ceiling: 3,
            media_ready_attempts: 3,
            settle_min_ms: 2_000,
            settle_max_ms: 3_000,
        }
    }
}
