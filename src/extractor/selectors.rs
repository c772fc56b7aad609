//! Selector tables and button labels used during item extraction.
//!
//! These strings are an externally-versioned contract owned by the scraped
//! site. Text-labeled buttons are resolved by scanning role buttons and
//! matching snapshot text, since CSS cannot match on label content.

use crate::error::{ScrapeError, ScrapeResult};
use crate::session::{Element, Session};

/// Probe for a video-capable element; presence resolves an item to
/// Video/Reel during type resolution.
pub const VIDEO_PROBE: &str = "video, div[data-video-id], div[aria-label='Play video']";

/// Caption text containers on the primary view.
pub const CAPTION_BLOCKS: &str =
    "div[data-ad-preview='message'] div[dir='auto'], div[data-ad-comet-preview='message'] div[dir='auto']";

/// Comment bodies inside the expanded comment panel.
pub const COMMENT_BODIES: &str = "div[role='article'] div[dir='auto']";

/// Container that hosts post imagery; waited on before collecting sources.
pub const IMAGE_CONTAINER: &str = "div[data-visualcompletion='media-vc-image'], a[href*='/photo'] img";

/// Image elements whose `src` is harvested.
pub const POST_IMAGES: &str =
    "div[data-visualcompletion='media-vc-image'] img, a[href*='/photo'] img";

/// Clickable controls that may carry a text label.
pub const ROLE_BUTTONS: &str = "div[role='button'], span[role='button']";

/// Media-readiness probes for the alternate view, tried in order.
pub const MEDIA_READY_PROBES: &[&str] = &[
    "video[src]",
    "div[data-video-id] video",
    "video source[src]",
];

/// Video elements whose `src` is harvested on the alternate view.
pub const VIDEO_SOURCES: &str = "video[src]";

pub const SEE_MORE: &str = "See more";
pub const SEE_LESS: &str = "See less";
pub const COMMENT: &str = "Comment";
pub const VIEW_MORE_COMMENTS: &str = "View more comments";
pub const MOST_RELEVANT: &str = "Most relevant";
pub const ALL_COMMENTS: &str = "All comments";

/// Find the first role button whose label matches `label`, by snapshot text
/// or `aria-label`.
pub async fn find_labeled_button(
    session: &dyn Session,
    label: &str,
) -> ScrapeResult<Element> {
    let buttons = session
        .find_all(ROLE_BUTTONS)
        .await
        .map_err(ScrapeError::from)?;
    buttons
        .into_iter()
        .find(|button| {
            button.text().trim().starts_with(label)
                || button.attr("aria-label").is_some_and(|l| l == label)
        })
        .ok_or_else(|| ScrapeError::TransientUi(format!("no `{label}` button visible")))
}

/// Click the first button labeled `label`.
pub async fn click_labeled_button(session: &dyn Session, label: &str) -> ScrapeResult<()> {
    let button = find_labeled_button(session, label).await?;
    session.click(&button).await.map_err(ScrapeError::from)
}
