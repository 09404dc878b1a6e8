//! Querying and normalizing every event kind for one block chunk.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::IndexerResult;
use crate::events::EventKindSpec;
use crate::normalize::CapturedEvent;
use crate::range::BlockRange;
use crate::retry::{retry, RetryPolicy};
use crate::rpc::LogSource;

/// Normalized events of one chunk.
///
/// `events` holds each spec's events in spec order; within a spec, events keep
/// the order the node returned them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedChunk {
    /// Blocks covered by this chunk.
    pub range: BlockRange,
    /// Normalized events.
    pub events: Vec<CapturedEvent>,
}

/// Query every spec over `range` concurrently and normalize the results.
///
/// Each ranged query is wrapped in [`retry`]. Normalization happens after the
/// query succeeds and is not retried. Undecodable logs are dropped.
///
/// # Errors
///
/// If any spec's query exhausts its retries, or a log fails to normalize,
/// the whole chunk fails and no partial result is returned. When several
/// specs fail, the error of the first one in spec order is reported.
#[instrument(skip(source, specs, policy), fields(range = %range))]
pub async fn run_chunk<S: LogSource>(
    source: &S,
    range: BlockRange,
    specs: &[EventKindSpec],
    policy: &RetryPolicy,
) -> IndexerResult<ScannedChunk> {
    let per_spec = join_all(specs.iter().map(|spec| async move {
        let raw_events = retry(policy, || source.query_logs(spec, range)).await?;

        let mut events = Vec::with_capacity(raw_events.len());
        for raw in &raw_events {
            if let Some(event) = spec.normalize(raw)? {
                events.push(event);
            }
        }
        debug!(
            kind = %spec.kind(),
            raw = raw_events.len(),
            normalized = events.len(),
            "Normalized chunk events"
        );
        IndexerResult::Ok(events)
    }))
    .await;

    let events = per_spec
        .into_iter()
        .collect::<IndexerResult<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(ScannedChunk { range, events })
}
