//! Mode pipeline: discovery, checkpoint filtering, dispatch, and the run
//! summary.
//!
//! The checkpoint store is read exactly once per run, here. Workers never
//! re-scan it, so they cannot race on checkpoint state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::checkpoint;
use crate::config::{CrawlConfig, CrawlMode};
use crate::crawl::dispatcher;
use crate::discovery;
use crate::downloader::Downloader;
use crate::extractor::ItemOutcome;
use crate::identity::{self, PostLink};
use crate::session::SessionProvider;
use crate::storage;

/// Aggregate result of one page run.
#[derive(Debug)]
pub struct CrawlSummary {
    pub page_name: String,
    /// Unique IDs produced by discovery (or rescan reconstruction).
    pub discovered: usize,
    /// IDs filtered out by the checkpoint store before dispatch.
    pub skipped: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcomes: Vec<ItemOutcome>,
}

/// Human-readable elapsed time, e.g. `1 hour, 2 minutes, 5 seconds`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hour{}", if hours == 1 { "" } else { "s" }));
    }
    if minutes > 0 {
        parts.push(format!(
            "{minutes} minute{}",
            if minutes == 1 { "" } else { "s" }
        ));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!(
            "{seconds} second{}",
            if seconds == 1 { "" } else { "s" }
        ));
    }
    parts.join(", ")
}

/// Build the work list for rescan mode: reconstruct URLs for every
/// incomplete ID on disk, with no discovery pass.
fn rescan_links(config: &CrawlConfig, index: &checkpoint::CheckpointIndex) -> Vec<PostLink> {
    let username = config.page_username();
    let base = config.site_base_url();
    let mut links = Vec::new();
    for id in index.incomplete_ids() {
        match identity::url_for_id(&base, &username, &id) {
            Some(url) => links.push(PostLink { id, url }),
            None => warn!("cannot reconstruct a url for incomplete id {id}; leaving it"),
        }
    }
    links
}

/// Run the full pipeline for one page.
pub async fn run_page(
    config: &CrawlConfig,
    provider: Arc<dyn SessionProvider>,
    downloader: Arc<dyn Downloader>,
    cancel: CancelToken,
) -> Result<CrawlSummary> {
    let started_at = Utc::now();
    let start = Instant::now();

    let page_root = storage::page_root(config.storage_root(), config.page_name());
    tokio::fs::create_dir_all(&page_root)
        .await
        .with_context(|| format!("failed to create {}", page_root.display()))?;

    // Single checkpoint read for the whole run.
    let index = checkpoint::scan(&page_root).context("checkpoint scan failed")?;
    info!(
        "checkpoint scan: {} known id(s) under {}",
        index.len(),
        page_root.display()
    );

    let (links, discovered, skipped) = match config.mode() {
        CrawlMode::Rescan => {
            let links = rescan_links(config, &index);
            info!("rescan: {} incomplete item(s) to reprocess", links.len());
            let discovered = links.len();
            (links, discovered, 0)
        }
        mode => {
            // Discovery owns its own session pair and releases it before any
            // worker starts.
            let report = {
                let pair = provider
                    .acquire()
                    .await
                    .context("failed to acquire a discovery session")?;
                discovery::discover(
                    pair.primary.as_ref(),
                    config.feed_url(),
                    &config.discovery_config(),
                    &cancel,
                )
                .await
                .context("discovery failed")?
            };
            let discovered = report.links.len();

            let links: Vec<PostLink> = if mode == CrawlMode::Resume {
                report
                    .links
                    .into_iter()
                    .filter(|link| !index.is_seen(&link.id))
                    .collect()
            } else {
                report.links
            };
            let skipped = discovered - links.len();
            if skipped > 0 {
                info!("resume: {discovered} found, {} new", links.len());
            }
            (links, discovered, skipped)
        }
    };

    let outcomes = if links.is_empty() {
        info!("nothing to process for {}", config.page_name());
        Vec::new()
    } else {
        dispatcher::dispatch(
            links,
            &page_root,
            provider,
            downloader,
            Arc::new(config.extractor_config()),
            config.concurrency(),
            cancel,
        )
        .await
    };

    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let summary = CrawlSummary {
        page_name: config.page_name().to_string(),
        discovered,
        skipped,
        processed: outcomes.len(),
        succeeded,
        failed: outcomes.len() - succeeded,
        started_at,
        elapsed: start.elapsed(),
        outcomes,
    };
    info!(
        "page {} done: {}/{} item(s) succeeded in {}",
        summary.page_name,
        summary.succeeded,
        summary.processed,
        format_elapsed(summary.elapsed)
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(1)), "1 second");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "1 minute, 1 second");
        assert_eq!(
            format_elapsed(Duration::from_secs(3_725)),
            "1 hour, 2 minutes, 5 seconds"
        );
        assert_eq!(format_elapsed(Duration::from_secs(120)), "2 minutes");
    }
}
