//! Comment thread loading and extraction.
//!
//! Loading reuses the shared pagination shape: count visible comment bodies,
//! attempt one "load more" action, and abort after a small fixed number of
//! consecutive no-growth iterations. Each "load more" is itself best-effort;
//! its failure counts toward the no-growth ceiling, never as a hard error.

use log::debug;

use super::selectors;
use crate::error::{ScrapeError, ScrapeResult};
use crate::identity::TextDeduper;
use crate::retry::smart_delay;
use crate::session::Session;

/// Tunables for comment loading.
#[derive(Debug, Clone, Copy)]
pub struct CommentConfig {
    /// Consecutive no-growth iterations before the load loop stops.
    pub no_growth_ceiling: u32,
    /// Inter-action delay range, milliseconds.
    pub action_min_ms: u64,
    pub action_max_ms: u64,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            no_growth_ceiling: 3,
            action_min_ms: 500,
            action_max_ms: 1_000,
        }
    }
}

/// Open the comment panel on the primary view.
pub async fn open_panel(session: &dyn Session, config: &CommentConfig) -> ScrapeResult<()> {
    selectors::click_labeled_button(session, selectors::COMMENT).await?;
    smart_delay(config.action_min_ms, config.action_max_ms).await;
    Ok(())
}

/// Switch the panel from relevance ordering to the exhaustive ordering.
/// Best-effort; callers ignore failure.
pub async fn switch_to_all(session: &dyn Session, config: &CommentConfig) -> ScrapeResult<()> {
    selectors::click_labeled_button(session, selectors::MOST_RELEVANT).await?;
    smart_delay(config.action_min_ms, config.action_max_ms).await;
    selectors::click_labeled_button(session, selectors::ALL_COMMENTS).await?;
    smart_delay(config.action_min_ms, config.action_max_ms).await;
    Ok(())
}

/// Load comments until no new content appears for the configured ceiling.
///
/// The enclosing stage bounds this with the comment-loading budget; expiry
/// there surfaces as the distinguished timeout condition.
pub async fn load_all(session: &dyn Session, config: &CommentConfig) -> ScrapeResult<()> {
    let mut last_count = 0usize;
    let mut stalls = 0u32;

    while stalls < config.no_growth_ceiling {
        let count = match session.find_all(selectors::COMMENT_BODIES).await {
            Ok(bodies) => bodies.len(),
            Err(e) => {
                debug!("comment count probe failed: {e}");
                stalls += 1;
                continue;
            }
        };
        if count == last_count {
            stalls += 1;
        } else {
            stalls = 0;
            last_count = count;
        }

        match selectors::click_labeled_button(session, selectors::VIEW_MORE_COMMENTS).await {
            Ok(()) => smart_delay(config.action_min_ms, config.action_max_ms).await,
            Err(e) => {
                debug!("load-more action unavailable: {e}");
                stalls += 1;
            }
        }
    }

    debug!("comment loading settled at {last_count} visible bodies");
    Ok(())
}

/// Extract loaded comment text, stripping the leading author line and
/// deduplicating through the per-item seen-set.
pub async fn collect(
    session: &dyn Session,
    dedup: &mut TextDeduper,
) -> ScrapeResult<Vec<String>> {
    let bodies = session
        .find_all(selectors::COMMENT_BODIES)
        .await
        .map_err(ScrapeError::from)?;

    let mut comments = Vec::new();
    for body in bodies {
        let text = body.text();
        if text.trim().is_empty() {
            continue;
        }
        // The first line of a body is the author name; keep content only.
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        let rest: Vec<&str> = lines.collect();
        let content = if rest.is_empty() {
            first.to_string()
        } else {
            rest.join(" ")
        };
        if let Some(accepted) = dedup.accept(&content) {
            comments.push(accepted);
        }
    }
    Ok(comments)
}
