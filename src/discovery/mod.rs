//! Feed discovery: scroll-paginate a feed view, harvest candidate links, and
//! terminate on whichever heuristic fires first.
//!
//! The produced set is deduplicated by content ID (first-seen URL wins) and
//! finite: a scroll-count ceiling, a minimum-ID target, a plateau of both
//! page height and ID count, or a cancellation signal ends the loop.
//! Re-invoking from the same feed URL yields a possibly-different but still
//! deduplicated set.

pub mod js;

use std::collections::HashSet;

use log::{debug, info, warn};
use rand::Rng;

use crate::cancel::CancelToken;
use crate::error::{ScrapeError, ScrapeResult};
use crate::identity::{self, PostLink};
use crate::retry::smart_delay;
use crate::session::{Session, SessionError};

/// Tunables for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Scroll ceiling; 0 means unbounded (target or plateau must stop us).
    pub max_scrolls: u32,
    /// Stop as soon as this many unique IDs have accumulated.
    pub min_posts: Option<usize>,
    /// Consecutive no-growth iterations (height AND ids) before stopping.
    pub plateau_threshold: u32,
    /// Issue a full reload every this many scrolls; 0 disables.
    pub reload_every: u32,
    /// Randomized scroll distance range, pixels.
    pub scroll_min_px: u64,
    pub scroll_max_px: u64,
    /// Randomized inter-scroll delay range, milliseconds.
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    /// Body zoom applied while harvesting, percent.
    pub zoom_percent: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_scrolls: 1_000,
            min_posts: Some(100),
            plateau_threshold: 3,
            reload_every: 200,
            scroll_min_px: 300,
            scroll_max_px: 1_000,
            delay_min_ms: 500,
            delay_max_ms: 1_000,
            zoom_percent: 50,
        }
    }
}

/// Outcome of one discovery run.
#[derive(Debug)]
pub struct DiscoveryReport {
    /// Deduplicated ID/URL set in discovery order.
    pub links: Vec<PostLink>,
    /// Scroll commands issued.
    pub scrolls: u32,
    /// Whether the run ended on the cancellation signal.
    pub interrupted: bool,
}

/// Collect currently-visible candidate links into the accumulator.
///
/// Returns how many new IDs this pass added.
async fn harvest(
    session: &dyn Session,
    seen: &mut HashSet<String>,
    links: &mut Vec<PostLink>,
) -> ScrapeResult<usize> {
    let anchors = match session.find_all(js::CANDIDATE_LINKS).await {
        Ok(anchors) => anchors,
        Err(SessionError::Backend(reason)) => return Err(ScrapeError::Resource(reason)),
        Err(e) => {
            debug!("candidate harvest failed transiently: {e}");
            return Ok(0);
        }
    };

    let mut added = 0;
    for anchor in anchors {
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        let Some(id) = identity::extract_post_id(href) else {
            continue;
        };
        if seen.insert(id.clone()) {
            links.push(PostLink {
                id,
                url: href.to_string(),
            });
            added += 1;
        }
    }
    Ok(added)
}

async fn page_height(session: &dyn Session) -> Option<i64> {
    match session.run_script(js::PAGE_HEIGHT).await {
        Ok(value) => value.as_i64(),
        Err(e) => {
            debug!("height sample failed: {e}");
            None
        }
    }
}

/// Discover content links from a feed URL.
///
/// Only `Resource`-class failures propagate; transient harvest and script
/// failures count toward the plateau instead of aborting the run.
pub async fn discover(
    session: &dyn Session,
    feed_url: &str,
    config: &DiscoveryConfig,
    cancel: &CancelToken,
) -> ScrapeResult<DiscoveryReport> {
    info!("discovering content links from {feed_url}");
    session
        .navigate(feed_url)
        .await
        .map_err(ScrapeError::from)?;
    smart_delay(config.delay_min_ms, config.delay_max_ms).await;

    if let Err(e) = session.run_script(&js::set_zoom(config.zoom_percent)).await {
        debug!("zoom adjustment failed: {e}");
    }

    let ceiling = if config.max_scrolls == 0 {
        u32::MAX
    } else {
        config.max_scrolls
    };

    let mut seen = HashSet::new();
    let mut links: Vec<PostLink> = Vec::new();
    let mut scrolls = 0u32;
    let mut interrupted = false;
    let mut last_height: Option<i64> = None;
    let mut height_stalls = 0u32;
    let mut id_stalls = 0u32;

    loop {
        if cancel.is_cancelled() {
            info!("discovery interrupted after {scrolls} scroll(s)");
            interrupted = true;
            break;
        }

        let added = harvest(session, &mut seen, &mut links).await?;
        if added == 0 {
            id_stalls += 1;
        } else {
            id_stalls = 0;
        }

        // Target mode: stop the moment the minimum is met, before issuing
        // another scroll.
        if let Some(target) = config.min_posts
            && links.len() >= target
        {
            info!("minimum post target ({target}) reached");
            break;
        }

        if scrolls >= ceiling {
            info!("scroll ceiling ({ceiling}) reached");
            break;
        }

        // A failed height sample counts as no growth so a dead page still
        // plateaus out instead of spinning until the ceiling.
        match page_height(session).await {
            Some(height) if Some(height) != last_height => {
                height_stalls = 0;
                last_height = Some(height);
            }
            _ => height_stalls += 1,
        }

        // Both conditions are required: a page can keep growing below the
        // fold while no new candidate links are visible yet, and vice versa.
        if height_stalls >= config.plateau_threshold && id_stalls >= config.plateau_threshold {
            info!(
                "plateau after {scrolls} scroll(s): height and id count unchanged for {} iterations",
                config.plateau_threshold
            );
            break;
        }

        let distance = {
            let mut rng = rand::rng();
            rng.random_range(config.scroll_min_px..=config.scroll_max_px.max(config.scroll_min_px))
        };
        if let Err(e) = session.run_script(&js::scroll_by(distance)).await {
            debug!("scroll command failed: {e}");
            id_stalls += 1;
        }
        scrolls += 1;
        smart_delay(config.delay_min_ms, config.delay_max_ms).await;

        if scrolls % 10 == 0 {
            debug!("scrolls: {scrolls}, unique ids: {}", links.len());
        }

        // Liveness measure against stalled virtual-scroll state: reload,
        // then re-establish zoom and scroll position before resuming.
        if config.reload_every > 0 && scrolls % config.reload_every == 0 {
            info!("reloading feed after {scrolls} scroll(s)");
            if let Err(e) = session.navigate(feed_url).await {
                warn!("feed reload failed: {e}");
            } else {
                smart_delay(config.delay_min_ms, config.delay_max_ms).await;
                if let Err(e) = session.run_script(&js::set_zoom(config.zoom_percent)).await {
                    debug!("zoom re-apply failed: {e}");
                }
                if let Some(height) = last_height
                    && let Err(e) = session.run_script(&js::scroll_to(height)).await
                {
                    debug!("scroll restore failed: {e}");
                }
            }
        }
    }

    if let Err(e) = session.run_script(&js::set_zoom(100)).await {
        debug!("zoom reset failed: {e}");
    }

    info!(
        "discovery finished: {} unique id(s) in {scrolls} scroll(s)",
        links.len()
    );
    Ok(DiscoveryReport {
        links,
        scrolls,
        interrupted,
    })
}
