//! Per-item extraction state machine.
//!
//! An item moves from navigation through type resolution into an ordered,
//! kind-specific stage sequence and always finishes finalized: stage
//! exhaustion degrades to an absent artifact, never to an abandoned item.
//! Only `Resource`-class failures escape, so the dispatcher can fail the
//! owning chunk.

pub mod comments;
pub mod media;
pub mod selectors;

use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use url::Url;

pub use comments::CommentConfig;

use crate::downloader::Downloader;
use crate::error::{ScrapeError, ScrapeResult};
use crate::identity::{self, PostKind, PostLink, TextDeduper};
use crate::retry::{RetryPolicy, retry_stage, smart_delay, with_timeout};
use crate::session::{Session, SessionPair};

/// Tunables for item extraction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Per-stage retry behavior.
    pub stage_retry: RetryPolicy,
    /// Coarse-grain retry for total navigation failure on the whole item.
    pub item_retry: RetryPolicy,
    /// Bounded wait for the video-capable-element probe.
    pub type_probe_timeout_secs: u64,
    /// Bounded wait for containers and media probes.
    pub element_timeout_secs: u64,
    /// Whole-budget guard for comment loading, distinct from per-click waits.
    pub comment_budget_secs: u64,
    pub comment: CommentConfig,
    /// Reload-and-retry attempts while waiting for alternate-view media.
    pub media_ready_attempts: u32,
    /// Post-navigation settle delay range, milliseconds.
    pub settle_min_ms: u64,
    pub settle_max_ms: u64,
    /// Host serving the lightweight alternate view. Empty derives
    /// `m.<host>` from the item URL.
    pub alt_view_host: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            stage_retry: RetryPolicy::default(),
            item_retry: RetryPolicy::default(),
            type_probe_timeout_secs: 5,
            element_timeout_secs: 10,
            comment_budget_secs: 30,
            comment: CommentConfig::default(),
            media_ready_attempts: 3,
            settle_min_ms: 2_000,
            settle_max_ms: 3_000,
            alt_view_host: String::new(),
        }
    }
}

/// One degraded stage, kept for the run log.
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: String,
}

/// Artifacts gathered for one item. Append-only within a run; flushed to
/// storage once every applicable stage has been attempted.
#[derive(Debug)]
pub struct ExtractionRecord {
    pub id: String,
    pub kind: PostKind,
    pub caption: Vec<String>,
    pub comments: Vec<String>,
    pub images_saved: usize,
    pub videos_saved: usize,
    pub failures: Vec<StageFailure>,
}

impl ExtractionRecord {
    fn new(id: String, kind: PostKind) -> Self {
        Self {
            id,
            kind,
            caption: Vec::new(),
            comments: Vec::new(),
            images_saved: 0,
            videos_saved: 0,
            failures: Vec::new(),
        }
    }

    /// Whether any artifact was actually produced.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.caption.is_empty()
            || !self.comments.is_empty()
            || self.images_saved > 0
            || self.videos_saved > 0
    }

    fn note_failure(&mut self, stage: &'static str, error: &ScrapeError) {
        warn!("item {}: stage `{stage}` degraded: {error}", self.id);
        self.failures.push(StageFailure {
            stage,
            error: error.to_string(),
        });
    }

    /// Absorb a stage result: failures degrade the artifact set, except
    /// `Resource`-class failures, which must reach the dispatcher.
    fn absorb<T>(
        &mut self,
        stage: &'static str,
        result: ScrapeResult<T>,
    ) -> ScrapeResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_resource() => Err(e),
            Err(e) => {
                self.note_failure(stage, &e);
                Ok(None)
            }
        }
    }
}

/// Terminal outcome for one item: a boolean plus a human-readable reason.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub id: String,
    pub success: bool,
    pub reason: String,
}

/// Rewrite an item URL onto the alternate-view host.
fn alternate_url(url: &str, alt_host: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    let target = if alt_host.is_empty() {
        format!("m.{}", host.trim_start_matches("www."))
    } else {
        alt_host.to_string()
    };
    parsed.set_host(Some(&target)).ok()?;
    Some(parsed.to_string())
}

/// Drive one item through the full state machine.
///
/// Always yields a terminal [`ItemOutcome`]; the only error path is a
/// `Resource`-class failure, which the dispatcher turns into a chunk
/// failure.
pub async fn extract_post(
    sessions: &SessionPair,
    downloader: &dyn Downloader,
    link: &PostLink,
    dir: &Path,
    config: &ExtractorConfig,
) -> ScrapeResult<ItemOutcome> {
    match run_item(sessions, downloader, link, dir, config).await {
        Ok(record) => Ok(summarize(&record)),
        Err(e) if e.is_resource() => Err(e),
        Err(e) => Ok(ItemOutcome {
            id: link.id.clone(),
            success: false,
            reason: e.to_string(),
        }),
    }
}

fn summarize(record: &ExtractionRecord) -> ItemOutcome {
    let success = record.has_content();
    let reason = if !success {
        "no artifacts extracted".to_string()
    } else if record.failures.is_empty() {
        "complete".to_string()
    } else {
        let degraded: Vec<&str> = record.failures.iter().map(|f| f.stage).collect();
        format!("partial ({} degraded)", degraded.join(", "))
    };
    ItemOutcome {
        id: record.id.clone(),
        success,
        reason,
    }
}

async fn run_item(
    sessions: &SessionPair,
    downloader: &dyn Downloader,
    link: &PostLink,
    dir: &Path,
    config: &ExtractorConfig,
) -> ScrapeResult<ExtractionRecord> {
    info!("processing item {} ({})", link.id, link.url);

    // Identity guard: a URL without a recognized content shape is skipped
    // before any session cost is spent on it.
    if identity::extract_post_id(&link.url).is_none() {
        return Err(ScrapeError::Identity(link.url.clone()));
    }

    // Coarse-grain wrap: total navigation failure is the one condition that
    // retries the whole opening step rather than a single stage.
    let kind = retry_stage(&config.item_retry, "open item", || async {
        open_and_resolve(sessions.primary.as_ref(), link, config).await
    })
    .await?;

    let mut record = ExtractionRecord::new(link.id.clone(), kind);
    debug!("item {} resolved as {kind:?}", link.id);

    let staged = match kind {
        PostKind::Video | PostKind::Reel => {
            video_stages(sessions, downloader, &mut record, link, dir, config).await
        }
        PostKind::Text | PostKind::Unknown => {
            text_stages(sessions.primary.as_ref(), downloader, &mut record, dir, config).await
        }
    };

    // Finalization happens no matter how the stages went; failure never
    // blocks it.
    finalize(&mut record, dir).await;
    staged?;

    Ok(record)
}

/// Navigate to the item, verify it still points at a recognized content
/// shape, and resolve its kind via the bounded video probe.
async fn open_and_resolve(
    session: &dyn Session,
    link: &PostLink,
    config: &ExtractorConfig,
) -> ScrapeResult<PostKind> {
    session
        .navigate(&link.url)
        .await
        .map_err(ScrapeError::from)?;
    smart_delay(config.settle_min_ms, config.settle_max_ms).await;

    let current = session.current_url().await.map_err(ScrapeError::from)?;
    if !identity::is_content_url(&current) {
        return Err(ScrapeError::Navigation(format!(
            "redirected away from content: {current}"
        )));
    }

    let probe = session
        .find_first(
            selectors::VIDEO_PROBE,
            Duration::from_secs(config.type_probe_timeout_secs),
        )
        .await;

    Ok(match probe {
        Ok(_) => match identity::kind_from_url(&link.url) {
            PostKind::Reel => PostKind::Reel,
            _ => PostKind::Video,
        },
        Err(_) => match identity::kind_from_url(&link.url) {
            PostKind::Reel => PostKind::Reel,
            PostKind::Video => PostKind::Video,
            _ => PostKind::Text,
        },
    })
}

/// Expand truncated caption text. Best-effort; failure is ignored entirely.
async fn expand_content(session: &dyn Session, config: &ExtractorConfig) -> ScrapeResult<()> {
    selectors::click_labeled_button(session, selectors::SEE_MORE).await?;
    smart_delay(config.comment.action_min_ms, config.comment.action_max_ms).await;
    Ok(())
}

/// Collect caption lines through a fresh per-call deduper.
async fn caption_lines(session: &dyn Session) -> ScrapeResult<Vec<String>> {
    let blocks = session
        .find_all(selectors::CAPTION_BLOCKS)
        .await
        .map_err(ScrapeError::from)?;
    if blocks.is_empty() {
        return Err(ScrapeError::TransientUi("no caption blocks visible".into()));
    }
    let mut dedup = TextDeduper::new();
    let mut lines = Vec::new();
    for block in blocks {
        for raw in block.text().lines() {
            if let Some(line) = dedup.accept(raw) {
                lines.push(line);
            }
        }
    }
    Ok(lines)
}

/// Stage sequence for a text post, on the primary view.
async fn text_stages(
    session: &dyn Session,
    downloader: &dyn Downloader,
    record: &mut ExtractionRecord,
    dir: &Path,
    config: &ExtractorConfig,
) -> ScrapeResult<()> {
    if let Err(e) = retry_stage(&config.stage_retry, "expand content", || async {
        expand_content(session, config).await
    })
    .await
    {
        debug!("content expansion skipped: {e}");
    }

    let caption = record.absorb(
        "extract caption",
        retry_stage(&config.stage_retry, "extract caption", || async {
            caption_lines(session).await
        })
        .await,
    )?;
    if let Some(lines) = caption {
        record.caption = lines;
    }

    let urls = record.absorb(
        "collect image urls",
        retry_stage(&config.stage_retry, "collect image urls", || async {
            media::image_urls(session, config.element_timeout_secs).await
        })
        .await,
    )?;
    if let Some(urls) = urls
        && !urls.is_empty()
    {
        record.images_saved =
            media::download_all(downloader, &urls, dir, "image", "jpg", &config.stage_retry).await;
        if record.images_saved == 0 {
            record.note_failure(
                "download images",
                &ScrapeError::TransientUi(format!("0 of {} image(s) saved", urls.len())),
            );
        }
    }

    comment_stages(session, record, config).await?;
    Ok(())
}

/// Comment sub-sequence shared by text posts (primary view) and reels
/// (alternate view).
async fn comment_stages(
    session: &dyn Session,
    record: &mut ExtractionRecord,
    config: &ExtractorConfig,
) -> ScrapeResult<()> {
    let opened = record.absorb(
        "open comment panel",
        retry_stage(&config.stage_retry, "open comment panel", || async {
            comments::open_panel(session, &config.comment).await
        })
        .await,
    )?;
    if opened.is_none() {
        return Ok(());
    }

    if let Err(e) = comments::switch_to_all(session, &config.comment).await {
        debug!("staying on relevance ordering: {e}");
    }

    record.absorb(
        "load comments",
        with_timeout(
            comments::load_all(session, &config.comment),
            config.comment_budget_secs,
            "comment loading",
        )
        .await,
    )?;

    let mut dedup = TextDeduper::new();
    let collected = record.absorb(
        "extract comments",
        comments::collect(session, &mut dedup).await,
    )?;
    if let Some(lines) = collected {
        record.comments = lines;
    }
    Ok(())
}

/// Stage sequence for video and reel posts: caption from the primary view
/// only (no scrolling, which destabilizes playback), then media and comments
/// from the alternate view.
async fn video_stages(
    sessions: &SessionPair,
    downloader: &dyn Downloader,
    record: &mut ExtractionRecord,
    link: &PostLink,
    dir: &Path,
    config: &ExtractorConfig,
) -> ScrapeResult<()> {
    let primary = sessions.primary.as_ref();

    if let Err(e) = retry_stage(&config.stage_retry, "expand content", || async {
        expand_content(primary, config).await
    })
    .await
    {
        debug!("content expansion skipped: {e}");
    }

    let caption = record.absorb(
        "extract caption",
        retry_stage(&config.stage_retry, "extract caption", || async {
            caption_lines(primary).await
        })
        .await,
    )?;
    if let Some(lines) = caption {
        record.caption = lines;
    }

    // Collapse again so the primary view stays stable for the next item.
    if let Err(e) = selectors::click_labeled_button(primary, selectors::SEE_LESS).await {
        debug!("caption collapse skipped: {e}");
    }

    let alternate = sessions.alternate.as_ref();
    let Some(alt_url) = alternate_url(&link.url, &config.alt_view_host) else {
        record.note_failure(
            "open alternate view",
            &ScrapeError::Navigation(format!("cannot derive alternate url for {}", link.url)),
        );
        return Ok(());
    };

    let opened = record.absorb(
        "open alternate view",
        retry_stage(&config.stage_retry, "open alternate view", || async {
            alternate
                .navigate(&alt_url)
                .await
                .map_err(ScrapeError::from)
        })
        .await,
    )?;
    if opened.is_none() {
        return Ok(());
    }
    smart_delay(config.settle_min_ms, config.settle_max_ms).await;

    let ready = record.absorb(
        "wait for media",
        media::wait_media_ready(
            alternate,
            &alt_url,
            config.media_ready_attempts,
            config.element_timeout_secs,
        )
        .await,
    )?;

    if ready.is_some() {
        let urls = record.absorb(
            "collect media urls",
            retry_stage(&config.stage_retry, "collect media urls", || async {
                media::video_urls(alternate).await
            })
            .await,
        )?;
        if let Some(urls) = urls {
            record.videos_saved =
                media::download_all(downloader, &urls, dir, "video", "mp4", &config.stage_retry)
                    .await;
            if record.videos_saved == 0 {
                record.note_failure(
                    "download media",
                    &ScrapeError::TransientUi(format!("0 of {} video(s) saved", urls.len())),
                );
            }
        }
    }

    // Plain videos skip comments entirely: the comment panel stalls behind
    // an active player. Reels tolerate it on the alternate view.
    if record.kind == PostKind::Reel {
        comment_stages(alternate, record, config).await?;
    } else {
        debug!("skipping comments for plain video {}", record.id);
    }

    Ok(())
}

/// Flush text artifacts to the item directory. Reached on every path,
/// including when every stage failed.
async fn finalize(record: &mut ExtractionRecord, dir: &Path) {
    if let Err(e) = crate::storage::save_lines(&record.caption, &dir.join("caption.txt")).await {
        record.note_failure("persist caption", &ScrapeError::Resource(e.to_string()));
    }
    if let Err(e) = crate::storage::save_lines(&record.comments, &dir.join("comments.txt")).await {
        record.note_failure("persist comments", &ScrapeError::Resource(e.to_string()));
    }
    info!(
        "item {} finalized: {} caption line(s), {} comment(s), {} image(s), {} video(s), {} degraded stage(s)",
        record.id,
        record.caption.len(),
        record.comments.len(),
        record.images_saved,
        record.videos_saved,
        record.failures.len()
    );
}
