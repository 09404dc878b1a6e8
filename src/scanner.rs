//! Windowed historical scan over a block range.
//!
//! The range is split into chunks of `chunk_size` blocks. Chunks are started
//! in ascending order and collected into a window; once the window holds
//! `max_concurrency` chunks, the scanner awaits all of them, appends their
//! events to the accumulated [`QueriedState`] in chunk order and writes a
//! checkpoint through the [`DurableSink`]. A final partial window is flushed
//! the same way.
//!
//! A chunk that exhausts its retries aborts the scan. Checkpoints written
//! before the failing window stay on disk.

use futures_util::future::join_all;
use std::future::Future;
use tracing::{debug, error, info, instrument};

use crate::chunk::{run_chunk, ScannedChunk};
use crate::error::IndexerResult;
use crate::events::EventKindSpec;
use crate::range::{BlockRange, ScanWindowConfig};
use crate::retry::RetryPolicy;
use crate::rpc::LogSource;
use crate::sink::{DurableSink, QueriedState};

/// Scan `range` for every spec and return the full captured state.
///
/// # Errors
///
/// Returns the error of the first failing chunk (in chunk order) of the
/// first window containing a failure. The sink is not written for that
/// window.
#[instrument(
    skip(source, window, specs, policy, sink),
    fields(range = %range, chunk_size = window.chunk_size(), max_concurrency = window.max_concurrency())
)]
pub async fn scan<S, K>(
    source: &S,
    range: BlockRange,
    window: &ScanWindowConfig,
    specs: &[EventKindSpec],
    policy: &RetryPolicy,
    sink: &K,
) -> IndexerResult<QueriedState>
where
    S: LogSource,
    K: DurableSink,
{
    let chunks = range.chunks(window.chunk_size());
    info!(chunks = chunks.len(), "Starting range scan");

    let mut state = QueriedState::new();
    let mut pending = Vec::with_capacity(window.max_concurrency());

    for chunk in chunks {
        debug!("Query from {} to {}", chunk.start(), chunk.end());
        pending.push(run_chunk(source, chunk, specs, policy));

        if pending.len() >= window.max_concurrency() {
            state = flush_window(state, std::mem::take(&mut pending), sink).await?;
        }
    }

    if !pending.is_empty() {
        state = flush_window(state, pending, sink).await?;
    }

    info!(events = state.len(), "Range scan complete");
    Ok(state)
}

/// Await a full window, fold its chunks into `state` and checkpoint.
///
/// Sink failures are logged; the scan continues with the in-memory state.
async fn flush_window<F, K>(
    mut state: QueriedState,
    window: Vec<F>,
    sink: &K,
) -> IndexerResult<QueriedState>
where
    F: Future<Output = IndexerResult<ScannedChunk>>,
    K: DurableSink,
{
    let chunks = join_all(window)
        .await
        .into_iter()
        .collect::<IndexerResult<Vec<_>>>()?;

    let last_block = chunks.last().map(|c| c.range.end());
    for chunk in chunks {
        state.append(chunk);
    }

    info!(
        events = state.len(),
        through_block = last_block,
        "Window complete, writing checkpoint"
    );
    if let Err(e) = sink.write(&state) {
        error!(error = %e, "Checkpoint write failed");
    }

    Ok(state)
}
