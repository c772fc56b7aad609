//! Media download: streamed HTTP fetch plus an optional external-program
//! alternate for video sources that resist direct fetching.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;

use crate::error::{ScrapeError, ScrapeResult};

/// Capability to fetch one media URL to a destination path.
///
/// Implementations stream to disk; large media is never buffered whole in
/// memory. A per-URL failure is a stage-level condition; only constructor
/// failures are `Resource`-class.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> ScrapeResult<u64>;
}

/// Streaming HTTP downloader.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ScrapeError::Resource(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> ScrapeResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ScrapeError::TransientUi(format!("fetch {url}: {e}")))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Resource(format!("create {}: {e}", parent.display())))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ScrapeError::Resource(format!("create {}: {e}", dest.display())))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| ScrapeError::TransientUi(format!("stream {url}: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ScrapeError::Resource(format!("write {}: {e}", dest.display())))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ScrapeError::Resource(format!("flush {}: {e}", dest.display())))?;

        debug!("downloaded {written} byte(s) from {url}");
        Ok(written)
    }
}

/// Downloader that delegates to an external program (yt-dlp style:
/// `<program> -o <dest> <url>`). Used for video sources whose direct media
/// URLs expire or refuse plain HTTP clients.
pub struct ExternalDownloader {
    program: String,
}

impl ExternalDownloader {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Downloader for ExternalDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> ScrapeResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Resource(format!("create {}: {e}", parent.display())))?;
        }

        let output = tokio::process::Command::new(&self.program)
            .arg("-o")
            .arg(dest)
            .arg(url)
            .output()
            .await
            .map_err(|e| ScrapeError::Resource(format!("spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("no output");
            warn!("{} failed for {url}: {tail}", self.program);
            return Err(ScrapeError::TransientUi(format!(
                "{} exited with {}: {tail}",
                self.program, output.status
            )));
        }

        let written = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(ScrapeError::TransientUi(format!(
                "{} produced an empty file for {url}",
                self.program
            )));
        }
        Ok(written)
    }
}
