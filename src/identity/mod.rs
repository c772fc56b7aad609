//! Content identity: canonical IDs derived from URLs, link-level dedup, and
//! URL reconstruction for rescan mode.
//!
//! Two URLs referring to the same underlying item always yield the same ID;
//! the ID is the sole dedup key and doubles as the checkpoint directory name.

use lazy_static::lazy_static;
use regex::Regex;

pub mod text_filter;

pub use text_filter::TextDeduper;

lazy_static! {
    /// Opaque share IDs appear both bare (`/pfbidXY`) and nested under a path
    /// segment (`/posts/pfbidXY`). Matching the token itself keeps both
    /// shapes on one canonical ID.
    static ref SHARE_ID: Regex =
        Regex::new(r"(pfbid[0-9A-Za-z]+)").expect("share id pattern compiles");
    static ref SEGMENT_ID: Regex =
        Regex::new(r"(?:posts|videos|reel)/([0-9A-Za-z_.-]+)").expect("segment id pattern compiles");
    static ref CONTENT_URL_SHAPES: Vec<Regex> = vec![
        Regex::new(r"/[^/]+/posts/").expect("posts shape compiles"),
        Regex::new(r"/[^/]+/videos/").expect("videos shape compiles"),
        Regex::new(r"/[^/]+/photos/").expect("photos shape compiles"),
        Regex::new(r"/photo/").expect("photo shape compiles"),
        Regex::new(r"/watch/?\?v=").expect("watch shape compiles"),
        Regex::new(r"/reel/").expect("reel shape compiles"),
        Regex::new(r"/[^/]+/permalink/").expect("permalink shape compiles"),
        Regex::new(r"/story\.php").expect("story shape compiles"),
    ];
}

/// A discovered content item: canonical ID plus the first URL seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    pub id: String,
    pub url: String,
}

/// Content type, resolved lazily during extraction. A video-capable element
/// may only be observable after navigating to the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Text,
    Video,
    Reel,
    Unknown,
}

/// Extract the canonical content ID from a URL.
///
/// Returns `None` when no known shape matches; callers must skip such URLs
/// before spending any session cost on them.
#[must_use]
pub fn extract_post_id(url: &str) -> Option<String> {
    let clean = url.split('?').next().unwrap_or(url).trim_end_matches('/');

    if let Some(caps) = SHARE_ID.captures(clean) {
        return Some(caps[1].to_string());
    }
    SEGMENT_ID
        .captures(clean)
        .map(|caps| caps[1].to_string())
}

/// Whether a URL (typically the post-navigation current URL) still points at
/// a recognized content shape. Redirects to login walls or the feed root
/// fail this check.
#[must_use]
pub fn is_content_url(url: &str) -> bool {
    CONTENT_URL_SHAPES.iter().any(|shape| shape.is_match(url))
}

/// Collapse raw candidate URLs into at most one entry per content ID.
///
/// First-seen URL wins. Order follows discovery order, which carries no
/// downstream meaning; ID uniqueness is the only guaranteed invariant.
#[must_use]
pub fn dedupe_links<I>(urls: I) -> Vec<PostLink>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for url in urls {
        let Some(id) = extract_post_id(&url) else {
            continue;
        };
        if seen.insert(id.clone()) {
            links.push(PostLink { id, url });
        }
    }
    links
}

/// Rebuild a canonical URL from a checkpoint directory name, for rescan mode.
///
/// All-digit IDs are plain posts; long or share-style IDs are videos. IDs
/// that fit neither shape cannot be reconstructed and are skipped by the
/// caller.
#[must_use]
pub fn url_for_id(base_url: &str, page_username: &str, id: &str) -> Option<String> {
    let root = format!("{}/{}", base_url.trim_end_matches('/'), page_username);
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{root}/posts/{id}"))
    } else if id.starts_with("pfbid") || id.len() > 20 {
        Some(format!("{root}/videos/{id}"))
    } else {
        None
    }
}

/// Kind hinted by the URL alone. `Unknown` resolves to Text or Video after
/// navigation, via the video-element probe.
#[must_use]
pub fn kind_from_url(url: &str) -> PostKind {
    if url.contains("/reel/") {
        PostKind::Reel
    } else if url.contains("/videos/") || url.contains("/watch") {
        PostKind::Video
    } else {
        PostKind::Unknown
    }
}

/// Kind inferred from an on-disk ID, mirroring [`url_for_id`]. Drives the
/// completeness policy when scanning checkpoints.
#[must_use]
pub fn infer_kind_from_id(id: &str) -> PostKind {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        PostKind::Text
    } else if id.starts_with("pfbid") || id.len() > 20 {
        PostKind::Video
    } else {
        PostKind::Unknown
    }
}
