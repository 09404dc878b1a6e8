//! Shared fixtures for integration tests: a scripted in-memory log source and
//! a sink that records every checkpoint.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use ens_event_indexer::error::{IndexerError, IndexerResult};
use ens_event_indexer::events::{EventKind, EventKindSpec, RawArgs, RawEvent};
use ens_event_indexer::range::BlockRange;
use ens_event_indexer::rpc::{LogSource, RawEventStream};
use ens_event_indexer::sink::{DurableSink, QueriedState};
use futures_util::stream::{self, StreamExt};

/// In-memory chain of registrar logs.
///
/// Ranged queries return the stored logs of the requested kind inside the
/// range. Chunks can be scripted to fail a number of times first, and every
/// query can be given a fixed latency while in-flight queries are counted.
#[derive(Default)]
pub struct ScriptedSource {
    logs: Vec<RawEvent>,
    live: Vec<RawEvent>,
    failures: Mutex<HashMap<u64, u32>>,
    queries: Mutex<Vec<(EventKind, BlockRange)>>,
    refuse_subscriptions: bool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn with_logs(logs: Vec<RawEvent>) -> Self {
        Self {
            logs,
            ..Self::default()
        }
    }

    pub fn with_live(live: Vec<RawEvent>) -> Self {
        Self {
            live,
            ..Self::default()
        }
    }

    pub fn refusing_subscriptions() -> Self {
        Self {
            refuse_subscriptions: true,
            ..Self::default()
        }
    }

    /// Fail every query for the chunk starting at `start`, `times` times.
    pub fn fail_chunk(self, start: u64, times: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(start, times);
        }
        self
    }

    /// Sleep for `latency` inside every ranged query.
    pub fn with_latency(self, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..self
        }
    }

    /// Highest number of ranged queries that were running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every query issued so far, in issue order.
    pub fn queries(&self) -> Vec<(EventKind, BlockRange)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl LogSource for ScriptedSource {
    async fn query_logs(
        &self,
        spec: &EventKindSpec,
        range: BlockRange,
    ) -> IndexerResult<Vec<RawEvent>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((spec.kind(), range));
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Ok(mut failures) = self.failures.lock() {
            if let Some(remaining) = failures.get_mut(&range.start()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(IndexerError::rpc(
                        format!("scripted failure for {range}"),
                        None,
                    ));
                }
            }
        }

        Ok(self
            .logs
            .iter()
            .filter(|log| log.kind == spec.kind())
            .filter(|log| {
                log.block_number
                    .is_some_and(|b| b >= range.start() && b <= range.end())
            })
            .cloned()
            .collect())
    }

    async fn subscribe(&self, spec: &EventKindSpec) -> IndexerResult<RawEventStream> {
        if self.refuse_subscriptions {
            return Err(IndexerError::subscription("subscriptions disabled", None));
        }
        let pushed: Vec<_> = self
            .live
            .iter()
            .filter(|log| log.kind == spec.kind())
            .cloned()
            .collect();
        Ok(stream::iter(pushed).boxed())
    }
}

/// Sink keeping a copy of every checkpoint.
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<QueriedState>>,
}

impl RecordingSink {
    pub fn snapshots(&self) -> Vec<QueriedState> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DurableSink for RecordingSink {
    fn write(&self, state: &QueriedState) -> IndexerResult<()> {
        self.snapshots
            .lock()
            .map_err(|_| IndexerError::sink("poisoned", None))?
            .push(state.clone());
        Ok(())
    }
}

fn tx(block: u64, index: u64) -> Option<B256> {
    let mut bytes = [0_u8; 32];
    bytes[..8].copy_from_slice(&block.to_be_bytes());
    bytes[24..].copy_from_slice(&index.to_be_bytes());
    Some(B256::from(bytes))
}

pub fn registered(block: u64, id: u64) -> RawEvent {
    RawEvent {
        kind: EventKind::NameRegistered,
        tx_hash: tx(block, 0),
        block_number: Some(block),
        log_index: Some(0),
        args: Some(RawArgs::NameRegistered {
            id: U256::from(id),
            owner: Address::repeat_byte(0x11),
            expires: U256::from(1_900_000_000_u64),
        }),
    }
}

pub fn renewed(block: u64, id: u64) -> RawEvent {
    RawEvent {
        kind: EventKind::NameRenewed,
        tx_hash: tx(block, 1),
        block_number: Some(block),
        log_index: Some(1),
        args: Some(RawArgs::NameRenewed {
            id: U256::from(id),
            expires: U256::from(1_950_000_000_u64),
        }),
    }
}

pub fn transfer(block: u64, from: Address, id: u64) -> RawEvent {
    RawEvent {
        kind: EventKind::Transfer,
        tx_hash: tx(block, 2),
        block_number: Some(block),
        log_index: Some(2),
        args: Some(RawArgs::Transfer {
            from,
            to: Address::repeat_byte(0x22),
            token_id: U256::from(id),
        }),
    }
}
