//! Browsing-session capability interface.
//!
//! The pipeline drives pages exclusively through [`Session`]: navigation,
//! element lookup, clicking, script evaluation, and URL inspection. Any
//! implementation satisfying this capability set is acceptable; selector
//! strings are an externally-versioned contract owned by the scraped site.
//!
//! [`Element`] is a snapshot taken at lookup time (text plus a handful of
//! attributes) with an opaque backend handle for later clicks. Snapshots keep
//! the trait object-safe and make scripted test sessions trivial.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ScrapeError;

pub mod browser;
pub mod cookies;

pub use browser::BrowserSessionProvider;

/// Failures raised by a session backend.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no element matched `{0}`")]
    NotFound(String),

    #[error("timed out after {1:?} waiting for `{0}`")]
    Timeout(String, Duration),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("browser backend error: {0}")]
    Backend(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for ScrapeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(selector) => {
                Self::TransientUi(format!("no element matched `{selector}`"))
            }
            SessionError::Timeout(selector, waited) => Self::Timeout {
                operation: format!("wait for `{selector}`"),
                seconds: waited.as_secs(),
            },
            SessionError::Navigation { url, reason } => {
                Self::Navigation(format!("{url}: {reason}"))
            }
            SessionError::Script(reason) => Self::TransientUi(reason),
            SessionError::Backend(reason) => Self::Resource(reason),
        }
    }
}

/// Snapshot of a DOM element taken at lookup time.
#[derive(Debug, Clone, Default)]
pub struct Element {
    handle: String,
    text: String,
    attrs: HashMap<String, String>,
}

impl Element {
    #[must_use]
    pub fn new(handle: String, text: String, attrs: HashMap<String, String>) -> Self {
        Self { handle, text, attrs }
    }

    /// Inner text at snapshot time, whitespace included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value captured at snapshot time.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Opaque backend handle; passed back to the owning session for clicks.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Capability to drive one isolated browsing context.
#[async_trait]
pub trait Session: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    /// All elements currently matching `selector`.
    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>>;

    /// First element matching `selector`, polling until `timeout`.
    async fn find_first(&self, selector: &str, timeout: Duration) -> SessionResult<Element>;

    async fn click(&self, element: &Element) -> SessionResult<()>;

    /// Evaluate a script in page context and return its JSON value.
    async fn run_script(&self, src: &str) -> SessionResult<serde_json::Value>;

    async fn current_url(&self) -> SessionResult<String>;
}

/// Exclusive session pair owned by one worker for its whole chunk: a primary
/// view plus an alternate (lightweight/mobile-equivalent) view for media
/// extraction. Dropping the pair releases both contexts.
pub struct SessionPair {
    pub primary: Arc<dyn Session>,
    pub alternate: Arc<dyn Session>,
}

/// Factory handing out fresh session pairs. One acquisition per worker;
/// pairs are never pooled or shared, bounding the blast radius of a session
/// crash to a single chunk.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> SessionResult<SessionPair>;
}
