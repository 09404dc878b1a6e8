//! Live subscription to registrar events.
//!
//! One subscription is opened per [`EventKindSpec`]; the streams are merged
//! and each pushed log is handled to completion before the next one is
//! polled. Handling a log means:
//!
//! 1. `Transfer` logs out of the null address (mints) are dropped before
//!    normalization. The batch scanner does not apply this filter.
//! 2. Logs without decodable arguments are dropped.
//! 3. Everything else is normalized and handed to the caller's callback.
//!
//! A log that fails to normalize is logged and skipped; the subscription
//! keeps running. Push subscriptions are not retried.

use futures_util::stream::{select_all, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::events::{EventKindSpec, RawEvent};
use crate::normalize::{normalize, CapturedEvent};
use crate::rpc::LogSource;

/// Outcome of handling one pushed log.
#[derive(Debug)]
pub enum Dispatch {
    /// Normalized and ready for the consumer.
    Forward(CapturedEvent),
    /// A mint transfer, filtered out.
    SkippedMint,
    /// The log carried no decodable arguments.
    SkippedUndecodable,
    /// Normalization failed.
    Failed(IndexerError),
}

/// Decide what to do with a pushed log.
#[must_use]
pub fn dispatch(raw: &RawEvent) -> Dispatch {
    if raw.is_mint_transfer() {
        return Dispatch::SkippedMint;
    }
    match normalize(raw) {
        Ok(Some(event)) => Dispatch::Forward(event),
        Ok(None) => Dispatch::SkippedUndecodable,
        Err(e) => Dispatch::Failed(e),
    }
}

/// Counters for a finished subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
    /// Events handed to the callback.
    pub forwarded: u64,
    /// Mint transfers filtered out.
    pub skipped_mints: u64,
    /// Logs without decodable arguments.
    pub skipped_undecodable: u64,
    /// Logs that failed to normalize.
    pub failed: u64,
}

/// Subscribe to every spec and forward normalized events to `on_event`.
///
/// Runs until all subscription streams end.
///
/// # Errors
///
/// Returns a subscription error if any subscription cannot be opened. Errors
/// on individual logs never end the subscription.
#[instrument(skip_all, fields(kinds = specs.len()))]
pub async fn subscribe<S, F>(
    source: &S,
    specs: &[EventKindSpec],
    mut on_event: F,
) -> IndexerResult<LiveStats>
where
    S: LogSource,
    F: FnMut(CapturedEvent),
{
    let mut streams = Vec::with_capacity(specs.len());
    for spec in specs {
        info!("Subscribe {} from contract {}", spec.kind(), spec.contract());
        streams.push(source.subscribe(spec).await?);
    }

    let mut merged = select_all(streams);
    let mut stats = LiveStats::default();

    while let Some(raw) = merged.next().await {
        match dispatch(&raw) {
            Dispatch::Forward(event) => {
                stats.forwarded += 1;
                on_event(event);
            }
            Dispatch::SkippedMint => {
                stats.skipped_mints += 1;
                debug!(tx_hash = ?raw.tx_hash, "Skipping mint transfer");
            }
            Dispatch::SkippedUndecodable => {
                stats.skipped_undecodable += 1;
                debug!(kind = %raw.kind, tx_hash = ?raw.tx_hash, "Skipping undecodable log");
            }
            Dispatch::Failed(e) => {
                stats.failed += 1;
                warn!(kind = %raw.kind, tx_hash = ?raw.tx_hash, error = %e, "Failed to normalize live event");
            }
        }
    }

    info!(
        forwarded = stats.forwarded,
        skipped_mints = stats.skipped_mints,
        failed = stats.failed,
        "Subscriptions closed"
    );
    Ok(stats)
}
