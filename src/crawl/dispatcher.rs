//! Work dispatch: partition discovered IDs into chunks and fan out one
//! worker per chunk, each owning an exclusive session pair.
//!
//! No two workers ever process the same content ID; the dispatcher owns
//! partitioning and a worker exclusively owns its chunk. A session pair is
//! acquired once per worker and released on every exit path when the pair
//! drops at the end of the worker task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::downloader::Downloader;
use crate::extractor::{self, ExtractorConfig, ItemOutcome};
use crate::identity::PostLink;
use crate::session::SessionProvider;
use crate::storage;

/// Split items into `workers` contiguous chunks of near-equal size. The
/// final chunk may be shorter; empty chunks are not produced.
#[must_use]
pub fn partition_chunks<T>(mut items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1);
    let chunk_size = items.len().div_ceil(workers);
    let mut chunks = Vec::with_capacity(workers);
    while !items.is_empty() {
        let rest = items.split_off(items.len().min(chunk_size));
        chunks.push(items);
        items = rest;
    }
    chunks
}

/// Process one chunk with an exclusively-owned session pair.
async fn run_chunk(
    worker_id: usize,
    chunk: Vec<PostLink>,
    page_root: PathBuf,
    provider: Arc<dyn SessionProvider>,
    downloader: Arc<dyn Downloader>,
    config: Arc<ExtractorConfig>,
    cancel: CancelToken,
) -> Vec<ItemOutcome> {
    info!("worker {worker_id}: starting on {} item(s)", chunk.len());

    let pair = match provider.acquire().await {
        Ok(pair) => pair,
        Err(e) => {
            error!("worker {worker_id}: session acquisition failed: {e}");
            return chunk
                .into_iter()
                .map(|link| ItemOutcome {
                    id: link.id,
                    success: false,
                    reason: format!("session unavailable: {e}"),
                })
                .collect();
        }
    };

    let mut outcomes = Vec::with_capacity(chunk.len());
    let mut chunk_failed: Option<String> = None;

    for link in chunk {
        if let Some(reason) = &chunk_failed {
            outcomes.push(ItemOutcome {
                id: link.id,
                success: false,
                reason: format!("chunk failed: {reason}"),
            });
            continue;
        }
        if cancel.is_cancelled() {
            outcomes.push(ItemOutcome {
                id: link.id,
                success: false,
                reason: "interrupted before start".into(),
            });
            continue;
        }

        let dir = storage::item_dir(&page_root, &link.id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            outcomes.push(ItemOutcome {
                id: link.id,
                success: false,
                reason: format!("cannot create item directory: {e}"),
            });
            continue;
        }

        match extractor::extract_post(&pair, downloader.as_ref(), &link, &dir, &config).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                // Resource-class: the session pair is gone. Remaining items
                // in this chunk fail; sibling chunks are unaffected.
                error!("worker {worker_id}: chunk-level failure: {e}");
                outcomes.push(ItemOutcome {
                    id: link.id,
                    success: false,
                    reason: e.to_string(),
                });
                chunk_failed = Some(e.to_string());
            }
        }
    }

    info!("worker {worker_id}: finished");
    outcomes
    // session pair drops here, releasing both browsing contexts
}

/// Fan out `links` across `concurrency` workers and block until every worker
/// reports, returning one outcome per input ID.
pub async fn dispatch(
    links: Vec<PostLink>,
    page_root: &Path,
    provider: Arc<dyn SessionProvider>,
    downloader: Arc<dyn Downloader>,
    config: Arc<ExtractorConfig>,
    concurrency: usize,
    cancel: CancelToken,
) -> Vec<ItemOutcome> {
    let chunks = partition_chunks(links, concurrency);
    info!(
        "dispatching {} chunk(s) across {} worker(s)",
        chunks.len(),
        concurrency.max(1)
    );

    let mut handles: Vec<(Vec<String>, JoinHandle<Vec<ItemOutcome>>)> = Vec::new();
    for (worker_id, chunk) in chunks.into_iter().enumerate() {
        let ids: Vec<String> = chunk.iter().map(|link| link.id.clone()).collect();
        let handle = tokio::spawn(run_chunk(
            worker_id + 1,
            chunk,
            page_root.to_path_buf(),
            Arc::clone(&provider),
            Arc::clone(&downloader),
            Arc::clone(&config),
            cancel.clone(),
        ));
        handles.push((ids, handle));
    }

    let mut outcomes = Vec::new();
    for (ids, handle) in handles {
        match handle.await {
            Ok(chunk_outcomes) => outcomes.extend(chunk_outcomes),
            Err(e) => {
                warn!("worker task aborted: {e}");
                outcomes.extend(ids.into_iter().map(|id| ItemOutcome {
                    id,
                    success: false,
                    reason: format!("worker aborted: {e}"),
                }));
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_are_contiguous_and_near_equal() {
        let chunks = partition_chunks((0..10).collect::<Vec<_>>(), 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![0, 1, 2, 3, 4]);
        assert_eq!(chunks[1], vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn final_chunk_may_be_shorter() {
        let chunks = partition_chunks((0..7).collect::<Vec<_>>(), 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[1].len(), 3);
        assert_eq!(chunks[2].len(), 1);
    }

    #[test]
    fn fewer_items_than_workers_yields_fewer_chunks() {
        let chunks = partition_chunks(vec![1, 2], 8);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks: Vec<Vec<u8>> = partition_chunks(Vec::new(), 4);
        assert!(chunks.is_empty());
    }

    #[test]
    fn chunks_cover_input_exactly_once() {
        let items: Vec<u32> = (0..23).collect();
        let chunks = partition_chunks(items.clone(), 4);
        let flattened: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }
}
