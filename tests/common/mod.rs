//! Scripted session, provider, and downloader doubles shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use feedscrape::error::{ScrapeError, ScrapeResult};
use feedscrape::downloader::Downloader;
use feedscrape::session::{
    Element, Session, SessionError, SessionPair, SessionProvider, SessionResult,
};

/// Anchor element carrying only an href.
pub fn link_element(href: &str) -> Element {
    let mut attrs = HashMap::new();
    attrs.insert("href".to_string(), href.to_string());
    Element::new(href.to_string(), String::new(), attrs)
}

/// Element whose snapshot text is `text`.
pub fn text_element(text: &str) -> Element {
    Element::new(text.to_string(), text.to_string(), HashMap::new())
}

/// Element with text and explicit attributes.
pub fn element_with_attrs(text: &str, attrs: &[(&str, &str)]) -> Element {
    let attrs = attrs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Element::new(text.to_string(), text.to_string(), attrs)
}

/// Feed view that reveals `per_scroll` more of `hrefs` with every scroll
/// command, growing the reported page height while links remain.
pub struct FeedSession {
    pub hrefs: Vec<String>,
    pub per_scroll: usize,
    pub scrolls: AtomicUsize,
    pub navigations: AtomicUsize,
    current: Mutex<String>,
}

impl FeedSession {
    pub fn new(hrefs: Vec<String>, per_scroll: usize) -> Self {
        Self {
            hrefs,
            per_scroll,
            scrolls: AtomicUsize::new(0),
            navigations: AtomicUsize::new(0),
            current: Mutex::new(String::new()),
        }
    }

    fn visible(&self) -> &[String] {
        let scrolls = self.scrolls.load(Ordering::SeqCst);
        let count = (scrolls + 1).saturating_mul(self.per_scroll);
        &self.hrefs[..count.min(self.hrefs.len())]
    }
}

#[async_trait]
impl Session for FeedSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        if selector.contains("/posts/") {
            Ok(self.visible().iter().map(|h| link_element(h)).collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn find_first(&self, selector: &str, timeout: Duration) -> SessionResult<Element> {
        Err(SessionError::Timeout(selector.to_string(), timeout))
    }

    async fn click(&self, _element: &Element) -> SessionResult<()> {
        Ok(())
    }

    async fn run_script(&self, src: &str) -> SessionResult<serde_json::Value> {
        if src.contains("scrollBy") {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            return Ok(serde_json::Value::Null);
        }
        if src.contains("scrollHeight") {
            // Height tracks revealed content, so it stops growing once the
            // link schedule is exhausted.
            let height = 1_000 + self.visible().len() as i64 * 40;
            return Ok(serde_json::json!(height));
        }
        Ok(serde_json::Value::Null)
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.current.lock().unwrap().clone())
    }
}

/// Session where navigation works but every lookup, click, and script
/// fails. Used to force every extraction stage to fail.
pub struct FailingSession {
    current: Mutex<String>,
}

impl FailingSession {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl Session for FailingSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        Err(SessionError::NotFound(selector.to_string()))
    }

    async fn find_first(&self, selector: &str, timeout: Duration) -> SessionResult<Element> {
        Err(SessionError::Timeout(selector.to_string(), timeout))
    }

    async fn click(&self, element: &Element) -> SessionResult<()> {
        Err(SessionError::NotFound(element.handle().to_string()))
    }

    async fn run_script(&self, _src: &str) -> SessionResult<serde_json::Value> {
        Err(SessionError::Script("scripted failure".into()))
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.current.lock().unwrap().clone())
    }
}

/// Session scripted with fixed elements per selector.
pub struct StubSession {
    pub by_selector: HashMap<String, Vec<Element>>,
    /// When set, `current_url` reports this instead of the navigated URL.
    pub redirect_to: Option<String>,
    current: Mutex<String>,
}

impl StubSession {
    pub fn new() -> Self {
        Self {
            by_selector: HashMap::new(),
            redirect_to: None,
            current: Mutex::new(String::new()),
        }
    }

    pub fn with(mut self, selector: &str, elements: Vec<Element>) -> Self {
        self.by_selector.insert(selector.to_string(), elements);
        self
    }

    pub fn redirecting_to(mut self, url: &str) -> Self {
        self.redirect_to = Some(url.to_string());
        self
    }
}

#[async_trait]
impl Session for StubSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        Ok(self.by_selector.get(selector).cloned().unwrap_or_default())
    }

    async fn find_first(&self, selector: &str, timeout: Duration) -> SessionResult<Element> {
        self.by_selector
            .get(selector)
            .and_then(|elements| elements.first().cloned())
            .ok_or_else(|| SessionError::Timeout(selector.to_string(), timeout))
    }

    async fn click(&self, _element: &Element) -> SessionResult<()> {
        Ok(())
    }

    async fn run_script(&self, _src: &str) -> SessionResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn current_url(&self) -> SessionResult<String> {
        if let Some(redirect) = &self.redirect_to {
            return Ok(redirect.clone());
        }
        Ok(self.current.lock().unwrap().clone())
    }
}

/// Provider that counts acquisitions and hands out failing session pairs.
pub struct FailingPairProvider {
    pub acquisitions: Arc<AtomicUsize>,
    pub refuse: bool,
}

impl FailingPairProvider {
    pub fn new() -> Self {
        Self {
            acquisitions: Arc::new(AtomicUsize::new(0)),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            acquisitions: Arc::new(AtomicUsize::new(0)),
            refuse: true,
        }
    }
}

#[async_trait]
impl SessionProvider for FailingPairProvider {
    async fn acquire(&self) -> SessionResult<SessionPair> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(SessionError::Backend("no browser available".into()));
        }
        Ok(SessionPair {
            primary: Arc::new(FailingSession::new()),
            alternate: Arc::new(FailingSession::new()),
        })
    }
}

/// Downloader double. `succeed` writes a small payload; otherwise every
/// fetch fails as a stage-level condition.
pub struct StubDownloader {
    pub succeed: bool,
    pub fetches: Arc<AtomicUsize>,
}

impl StubDownloader {
    pub fn failing() -> Self {
        Self {
            succeed: false,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn saving() -> Self {
        Self {
            succeed: true,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> ScrapeResult<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            tokio::fs::write(dest, b"media-bytes")
                .await
                .map_err(|e| ScrapeError::Resource(e.to_string()))?;
            Ok(11)
        } else {
            Err(ScrapeError::TransientUi(format!("refusing to fetch {url}")))
        }
    }
}

/// Extraction config tuned so forced-failure tests finish quickly.
pub fn fast_extractor_config() -> feedscrape::ExtractorConfig {
    use feedscrape::extractor::CommentConfig;
    use feedscrape::retry::RetryPolicy;

    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 1,
        max_delay_ms: 2,
    };
    feedscrape::ExtractorConfig {
        stage_retry: policy,
        item_retry: policy,
        type_probe_timeout_secs: 1,
        element_timeout_secs: 1,
        comment_budget_secs: 2,
        comment: CommentConfig {
            no_growth_ceiling: 2,
            action_min_ms: 1,
            action_max_ms: 2,
        },
        media_ready_attempts: 1,
        settle_min_ms: 1,
        settle_max_ms: 2,
        alt_view_host: String::new(),
    }
}
