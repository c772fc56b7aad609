// Feed crawler binary.
//
// Takes a single positional path to a JSON run spec describing one or more
// pages to crawl. Ctrl-C requests cancellation: discovery stops at the next
// scroll boundary and workers stop picking up new items.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Deserialize;

use feedscrape::crawl::{format_elapsed, run_page};
use feedscrape::{
    BrowserSessionProvider, CancelToken, CrawlConfig, CrawlMode, Downloader, ExternalDownloader,
    HttpDownloader, SessionProvider,
};

/// One page entry in the run spec.
#[derive(Debug, Deserialize)]
struct PageSpec {
    url: String,
    name: Option<String>,
    max_scroll: Option<u32>,
    min_posts: Option<usize>,
    #[serde(default)]
    resume: bool,
    #[serde(default)]
    rescan: bool,
}

/// Top-level run spec.
#[derive(Debug, Deserialize)]
struct RunSpec {
    pages: Vec<PageSpec>,
    storage_root: Option<PathBuf>,
    cookies: Option<PathBuf>,
    browsers: Option<usize>,
    headless: Option<bool>,
    #[serde(default)]
    use_external_downloader: bool,
    external_downloader_program: Option<String>,
}

fn page_config(spec: &RunSpec, page: &PageSpec) -> Result<CrawlConfig> {
    let mode = if page.rescan {
        CrawlMode::Rescan
    } else if page.resume {
        CrawlMode::Resume
    } else {
        CrawlMode::Fresh
    };

    let mut builder = CrawlConfig::builder()
        .storage_root(spec.storage_root.clone().unwrap_or_else(|| "./data".into()))
        .mode(mode)
        .concurrency(spec.browsers.unwrap_or(2))
        .headless(spec.headless.unwrap_or(true))
        .use_external_downloader(spec.use_external_downloader);
    if let Some(cookies) = &spec.cookies {
        builder = builder.cookies_path(cookies.clone());
    }
    if let Some(program) = &spec.external_downloader_program {
        builder = builder.external_downloader_program(program.clone());
    }
    if let Some(name) = &page.name {
        builder = builder.page_name(name.clone());
    }
    let mut builder = builder.feed_url(page.url.clone());
    if let Some(ceiling) = page.max_scroll {
        builder = builder.max_scrolls(ceiling);
    }
    if page.min_posts.is_some() {
        builder = builder.min_posts(page.min_posts);
    }
    builder.build()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let spec_path = std::env::args()
        .nth(1)
        .context("usage: feedscrape <run-spec.json>")?;
    let body = std::fs::read_to_string(&spec_path)
        .with_context(|| format!("failed to read run spec {spec_path}"))?;
    let spec: RunSpec =
        serde_json::from_str(&body).with_context(|| format!("invalid run spec {spec_path}"))?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing in-flight items");
                cancel.cancel();
            }
        });
    }

    let provider: Arc<dyn SessionProvider> = Arc::new(BrowserSessionProvider::new(
        spec.headless.unwrap_or(true),
        spec.cookies.clone(),
    ));
    let downloader: Arc<dyn Downloader> = if spec.use_external_downloader {
        Arc::new(ExternalDownloader::new(
            spec.external_downloader_program
                .clone()
                .unwrap_or_else(|| "yt-dlp".to_string()),
        ))
    } else {
        Arc::new(HttpDownloader::new()?)
    };

    let run_start = std::time::Instant::now();
    for page in &spec.pages {
        if cancel.is_cancelled() {
            warn!("skipping remaining pages after interrupt");
            break;
        }
        let config = match page_config(&spec, page) {
            Ok(config) => config,
            Err(e) => {
                error!("skipping page {}: {e}", page.url);
                continue;
            }
        };
        info!("=== crawling {} ===", config.page_name());
        match run_page(
            &config,
            Arc::clone(&provider),
            Arc::clone(&downloader),
            cancel.clone(),
        )
        .await
        {
            Ok(summary) => info!(
                "{}: {} discovered, {} skipped, {}/{} succeeded",
                summary.page_name,
                summary.discovered,
                summary.skipped,
                summary.succeeded,
                summary.processed
            ),
            Err(e) => error!("page {} failed: {e:#}", config.page_name()),
        }
    }

    info!(
        "processing completed in {}",
        format_elapsed(run_start.elapsed())
    );
    Ok(())
}
