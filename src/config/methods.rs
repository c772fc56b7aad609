//! Derived configuration: the per-subsystem config values the pipeline hands
//! to discovery and extraction, plus URL-derived helpers.

use url::Url;

use super::types::CrawlConfig;
use crate::discovery::DiscoveryConfig;
use crate::extractor::{CommentConfig, ExtractorConfig};
use crate::retry::RetryPolicy;

impl CrawlConfig {
    /// Username segment of the feed URL, used to reconstruct item URLs in
    /// rescan mode.
    #[must_use]
    pub fn page_username(&self) -> String {
        self.feed_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Scheme + host of the feed URL, e.g. `https://www.example.com`.
    #[must_use]
    pub fn site_base_url(&self) -> String {
        match Url::parse(&self.feed_url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => format!("{}://{host}", parsed.scheme()),
                None => self.feed_url.clone(),
            },
            Err(_) => self.feed_url.clone(),
        }
    }

    fn stage_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.stage_retries.max(1),
            base_delay_ms: self.retry_base_delay_ms,
            max_delay_ms: self.retry_base_delay_ms.saturating_mul(8),
        }
    }

    /// Discovery tunables for this run.
    #[must_use]
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_scrolls: self.max_scrolls,
            min_posts: self.min_posts,
            plateau_threshold: self.plateau_threshold,
            reload_every: self.reload_every,
            scroll_min_px: self.scroll_min_px,
            scroll_max_px: self.scroll_max_px,
            delay_min_ms: self.delay_min_ms,
            delay_max_ms: self.delay_max_ms,
            zoom_percent: self.zoom_percent,
        }
    }

    /// Extraction tunables for this run.
    #[must_use]
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            stage_retry: self.stage_retry_policy(),
            item_retry: RetryPolicy {
                max_attempts: self.item_retries.max(1),
                base_delay_ms: self.retry_base_delay_ms,
                max_delay_ms: self.retry_base_delay_ms.saturating_mul(8),
            },
            type_probe_timeout_secs: self.type_probe_timeout_secs,
            element_timeout_secs: self.element_timeout_secs,
            comment_budget_secs: self.comment_budget_secs,
            comment: CommentConfig {
                no_growth_ceiling: self.comment_no_growth_ceiling,
                action_min_ms: self.delay_min_ms,
                action_max_ms: self.delay_max_ms,
            },
            media_ready_attempts: self.media_ready_attempts,
            settle_min_ms: self.settle_min_ms,
            settle_max_ms: self.settle_max_ms,
            alt_view_host: self.alt_view_host.clone(),
        }
    }
}
