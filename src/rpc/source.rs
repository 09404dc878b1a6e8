//! The upstream event source seen by the scanner and the subscriber.
//!
//! [`LogSource`] is the narrow interface the core needs from a chain node:
//! a ranged log query and a push subscription, both per [`EventKindSpec`].
//! [`AlloyLogSource`] implements it on top of an Alloy provider; tests plug
//! in scripted sources.

use futures_util::stream::{BoxStream, StreamExt};
use tracing::{debug, info, instrument};

use alloy::providers::Provider as AlloyProvider;

use super::provider::Provider;
use crate::error::{IndexerError, IndexerResult};
use crate::events::{EventKindSpec, RawEvent};
use crate::range::BlockRange;

/// Stream of raw events pushed by a live subscription.
pub type RawEventStream = BoxStream<'static, RawEvent>;

/// Source of raw registrar events.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    /// Fetch every log matching `spec` in `range`, in chain order
    /// (ascending block, then log index).
    ///
    /// # Errors
    ///
    /// Any failure is reported as an RPC error; callers retry it.
    async fn query_logs(&self, spec: &EventKindSpec, range: BlockRange)
        -> IndexerResult<Vec<RawEvent>>;

    /// Subscribe to new logs matching `spec`.
    ///
    /// # Errors
    ///
    /// Returns a subscription error if the subscription cannot be created.
    async fn subscribe(&self, spec: &EventKindSpec) -> IndexerResult<RawEventStream>;
}

/// [`LogSource`] backed by an Alloy provider.
#[derive(Clone)]
pub struct AlloyLogSource {
    provider: Provider,
}

impl AlloyLogSource {
    /// Wrap a connected provider.
    #[must_use]
    pub const fn new(provider: Provider) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }
}

impl LogSource for AlloyLogSource {
    #[instrument(skip(self, spec), fields(kind = %spec.kind(), range = %range))]
    async fn query_logs(
        &self,
        spec: &EventKindSpec,
        range: BlockRange,
    ) -> IndexerResult<Vec<RawEvent>> {
        info!("Query from {} to {} for {}", range.start(), range.end(), spec.kind());

        let logs = self
            .provider
            .get_logs(&spec.ranged_filter(range))
            .await
            .map_err(|e| {
                IndexerError::rpc(
                    format!("eth_getLogs failed for {} in {range}", spec.kind()),
                    Some(Box::new(e)),
                )
            })?;

        debug!(count = logs.len(), "Fetched logs");

        let kind = spec.kind();
        Ok(logs.iter().map(|log| RawEvent::from_log(kind, log)).collect())
    }

    #[instrument(skip(self, spec), fields(kind = %spec.kind()))]
    async fn subscribe(&self, spec: &EventKindSpec) -> IndexerResult<RawEventStream> {
        info!(kind = %spec.kind(), "Subscribing to registrar events");

        let subscription = self
            .provider
            .subscribe_logs(spec.filter())
            .await
            .map_err(|e| {
                IndexerError::subscription(
                    format!("eth_subscribe failed for {}", spec.kind()),
                    Some(Box::new(e)),
                )
            })?;

        let kind = spec.kind();
        let stream = subscription
            .into_stream()
            .map(move |log| RawEvent::from_log(kind, &log))
            .boxed();

        info!(kind = %kind, "Subscription active");
        Ok(stream)
    }
}
