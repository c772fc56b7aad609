//! In-page scripts and selectors used by feed discovery.
//!
//! Selector strings are a contract owned by the scraped site, not by this
//! crate; they live here so a layout change touches one file.

/// Anchors that can carry a content link in the feed view.
pub const CANDIDATE_LINKS: &str =
    "a[href*='/posts/'], a[href*='/videos/'], a[href*='/reel/']";

/// Current document height; sampled around each scroll to detect plateaus.
pub const PAGE_HEIGHT: &str = "document.documentElement.scrollHeight";

/// Scroll down by a pixel delta.
#[must_use]
pub fn scroll_by(pixels: u64) -> String {
    format!("window.scrollBy(0, {pixels});")
}

/// Jump to an absolute vertical position (used after a liveness reload).
#[must_use]
pub fn scroll_to(y: i64) -> String {
    format!("window.scrollTo(0, {y});")
}

/// Zoom the body so each viewport shows more of the feed.
#[must_use]
pub fn set_zoom(percent: u32) -> String {
    format!("document.body.style.zoom = '{percent}%';")
}
