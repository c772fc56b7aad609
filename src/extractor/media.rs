//! Media source harvesting and download stages.

use std::path::Path;
use std::time::Duration;

use log::{debug, warn};

use super::selectors;
use crate::downloader::Downloader;
use crate::error::{ScrapeError, ScrapeResult};
use crate::retry::{RetryPolicy, retry_stage, smart_delay};
use crate::session::Session;

/// Collect image source URLs from the primary view.
///
/// Waits for the media container first; a post without one has no image
/// artifact and the stage degrades.
pub async fn image_urls(
    session: &dyn Session,
    wait_secs: u64,
) -> ScrapeResult<Vec<String>> {
    session
        .find_first(selectors::IMAGE_CONTAINER, Duration::from_secs(wait_secs))
        .await
        .map_err(ScrapeError::from)?;

    let images = session
        .find_all(selectors::POST_IMAGES)
        .await
        .map_err(ScrapeError::from)?;

    let mut urls = Vec::new();
    for image in images {
        if let Some(src) = image.attr("src")
            && !src.starts_with("data:")
            && !urls.iter().any(|seen| seen == src)
        {
            urls.push(src.to_string());
        }
    }
    Ok(urls)
}

/// Wait for the alternate view to report playable media, reloading the item
/// between bounded attempts. Each attempt probes the selector list in order.
pub async fn wait_media_ready(
    session: &dyn Session,
    item_url: &str,
    attempts: u32,
    probe_secs: u64,
) -> ScrapeResult<()> {
    let probe_timeout = Duration::from_secs(probe_secs.max(1));
    for attempt in 1..=attempts.max(1) {
        for probe in selectors::MEDIA_READY_PROBES {
            if session.find_first(probe, probe_timeout).await.is_ok() {
                debug!("media ready via `{probe}` on attempt {attempt}");
                return Ok(());
            }
        }
        if attempt < attempts {
            debug!("media not ready, reloading {item_url} (attempt {attempt})");
            if let Err(e) = session.navigate(item_url).await {
                warn!("reload during media wait failed: {e}");
            }
            smart_delay(1_000, 2_000).await;
        }
    }
    Err(ScrapeError::timeout(
        "media readiness",
        u64::from(attempts) * probe_secs * selectors::MEDIA_READY_PROBES.len() as u64,
    ))
}

/// Collect video source URLs from the alternate view.
pub async fn video_urls(session: &dyn Session) -> ScrapeResult<Vec<String>> {
    let videos = session
        .find_all(selectors::VIDEO_SOURCES)
        .await
        .map_err(ScrapeError::from)?;

    let mut urls = Vec::new();
    for video in videos {
        if let Some(src) = video.attr("src")
            && !src.starts_with("blob:")
            && !urls.iter().any(|seen| seen == src)
        {
            urls.push(src.to_string());
        }
    }
    if urls.is_empty() {
        return Err(ScrapeError::TransientUi("no media source urls found".into()));
    }
    Ok(urls)
}

/// Download each URL to `<dir>/<prefix>_<n>.<ext>`, retrying per file.
/// Per-file exhaustion is logged and skipped; the count of files actually
/// written is returned.
pub async fn download_all(
    downloader: &dyn Downloader,
    urls: &[String],
    dir: &Path,
    prefix: &str,
    extension: &str,
    policy: &RetryPolicy,
) -> usize {
    let mut saved = 0usize;
    for (index, url) in urls.iter().enumerate() {
        let dest = crate::storage::media_path(dir, prefix, index + 1, extension);
        let result = retry_stage(policy, "media download", || async {
            downloader.fetch(url, &dest).await
        })
        .await;
        match result {
            Ok(bytes) => {
                debug!("saved {} ({bytes} bytes)", dest.display());
                saved += 1;
            }
            Err(e) => warn!("giving up on {url}: {e}"),
        }
    }
    saved
}
