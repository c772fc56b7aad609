//! chromiumoxide-backed [`Session`] implementation.
//!
//! Each session owns a dedicated browser process, its CDP handler task, and a
//! single page. Dropping the session aborts the handler task, which releases
//! the browsing context on every exit path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use super::{Element, Session, SessionError, SessionPair, SessionProvider, SessionResult};
use crate::session::cookies;

/// Attributes captured into every [`Element`] snapshot.
const SNAPSHOT_ATTRS: &[&str] = &["href", "src", "aria-label", "role", "alt"];

const FIND_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Which view a session presents. The alternate view gets a phone-sized
/// viewport so host-swapped item URLs render their lightweight layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewProfile {
    Desktop,
    Mobile,
}

impl ViewProfile {
    fn window_size(self) -> (u32, u32) {
        match self {
            Self::Desktop => (1920, 1080),
            Self::Mobile => (412, 915),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides all other discovery.
pub fn find_browser_executable() -> SessionResult<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to a non-existent file: {}",
            path.display()
        );
    }

    let candidates: Vec<PathBuf> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/Applications/Chromium.app/Contents/MacOS/Chromium".into(),
            "/opt/homebrew/bin/chromium".into(),
        ]
    } else {
        vec![
            "/usr/bin/google-chrome".into(),
            "/usr/bin/google-chrome-stable".into(),
            "/usr/bin/chromium".into(),
            "/usr/bin/chromium-browser".into(),
            "/snap/bin/chromium".into(),
            "/opt/google/chrome/chrome".into(),
        ]
    };

    for path in candidates {
        if path.exists() {
            info!("found browser at {}", path.display());
            return Ok(path);
        }
    }

    for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output()
            && output.status.success()
        {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() {
                info!("found browser via `which {cmd}`: {found}");
                return Ok(PathBuf::from(found));
            }
        }
    }

    Err(SessionError::Backend(
        "no Chrome/Chromium executable found; set CHROMIUM_PATH".into(),
    ))
}

/// One browser process + one page, driven over CDP.
pub struct PageSession {
    page: Page,
    _browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
    /// Live element handles from the most recent lookups, keyed by the
    /// snapshot handle. Cleared on navigation; entries are stale after it.
    elements: Mutex<HashMap<String, chromiumoxide::element::Element>>,
    next_handle: AtomicU64,
}

impl PageSession {
    /// Launch a browser with the given profile and open a blank page.
    pub async fn launch(
        profile: ViewProfile,
        headless: bool,
        cookies_path: Option<&std::path::Path>,
    ) -> SessionResult<Self> {
        let executable = find_browser_executable()?;
        let user_data_dir = std::env::temp_dir().join(format!(
            "feedscrape_{}_{}_{}",
            profile.label(),
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
        ));
        std::fs::create_dir_all(&user_data_dir)
            .map_err(|e| SessionError::Backend(format!("user data dir: {e}")))?;

        let (width, height) = profile.window_size();
        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(width, height)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(executable)
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio")
            .arg("--autoplay-policy=no-user-gesture-required");
        builder = if headless {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| SessionError::Backend(format!("browser config: {e}")))?;

        info!("launching {} browser", profile.label());
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Backend(format!("browser launch: {e}")))?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let msg = e.to_string();
                    // Chrome emits CDP events chromiumoxide does not model;
                    // those deserialize errors are noise, not faults.
                    let benign = msg.contains("data did not match any variant")
                        || msg.contains("Failed to deserialize WS response");
                    if benign {
                        trace!("suppressed benign CDP error: {msg}");
                    } else {
                        error!("browser handler error: {msg}");
                    }
                }
            }
            debug!("browser handler task finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Backend(format!("new page: {e}")))?;

        if let Some(path) = cookies_path {
            match cookies::load_cookie_params(path) {
                Ok(params) if !params.is_empty() => {
                    let count = params.len();
                    page.set_cookies(params)
                        .await
                        .map_err(|e| SessionError::Backend(format!("set cookies: {e}")))?;
                    info!("loaded {count} cookie(s) from {}", path.display());
                }
                Ok(_) => warn!("cookie file {} held no usable cookies", path.display()),
                Err(e) => warn!("failed to load cookies from {}: {e}", path.display()),
            }
        }

        Ok(Self {
            page,
            _browser: browser,
            handler_task,
            user_data_dir,
            elements: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        })
    }

    async fn snapshot(
        &self,
        el: chromiumoxide::element::Element,
    ) -> SessionResult<Element> {
        let text = el
            .inner_text()
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let mut attrs = HashMap::new();
        for name in SNAPSHOT_ATTRS {
            if let Ok(Some(value)) = el.attribute(*name).await {
                attrs.insert((*name).to_string(), value);
            }
        }
        let handle = self
            .next_handle
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        self.elements.lock().await.insert(handle.clone(), el);
        Ok(Element::new(handle, text, attrs))
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.handler_task.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!(
                "failed to clean up user data dir {}: {e}",
                self.user_data_dir.display()
            );
        }
    }
}

#[async_trait]
impl Session for PageSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.elements.lock().await.clear();
        self.page.goto(url).await.map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        let found = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;
        let mut snapshots = Vec::with_capacity(found.len());
        for el in found {
            snapshots.push(self.snapshot(el).await?);
        }
        Ok(snapshots)
    }

    async fn find_first(&self, selector: &str, timeout: Duration) -> SessionResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(el) => return self.snapshot(el).await,
                Err(_) if Instant::now() >= deadline => {
                    return Err(SessionError::Timeout(selector.to_string(), timeout));
                }
                Err(_) => tokio::time::sleep(FIND_POLL_INTERVAL).await,
            }
        }
    }

    async fn click(&self, element: &Element) -> SessionResult<()> {
        let cache = self.elements.lock().await;
        let Some(el) = cache.get(element.handle()) else {
            return Err(SessionError::NotFound(format!(
                "stale element handle {}",
                element.handle()
            )));
        };
        el.click()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Backend(e.to_string()))
    }

    async fn run_script(&self, src: &str) -> SessionResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(src)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.page
            .url()
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
            .ok_or_else(|| SessionError::Backend("page reports no url".into()))
    }
}

/// Hands out fresh desktop/mobile session pairs backed by dedicated browser
/// processes.
pub struct BrowserSessionProvider {
    headless: bool,
    cookies_path: Option<PathBuf>,
}

impl BrowserSessionProvider {
    #[must_use]
    pub fn new(headless: bool, cookies_path: Option<PathBuf>) -> Self {
        Self {
            headless,
            cookies_path,
        }
    }
}

#[async_trait]
impl SessionProvider for BrowserSessionProvider {
    async fn acquire(&self) -> SessionResult<SessionPair> {
        let cookies = self.cookies_path.as_deref();
        let primary = PageSession::launch(ViewProfile::Desktop, self.headless, cookies).await?;
        let alternate = PageSession::launch(ViewProfile::Mobile, self.headless, cookies).await?;
        Ok(SessionPair {
            primary: std::sync::Arc::new(primary),
            alternate: std::sync::Arc::new(alternate),
        })
    }
}
