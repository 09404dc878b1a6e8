//! Integration tests for the windowed range scanner.
//!
//! A scripted in-memory source stands in for the node, so chunk boundaries,
//! retries and checkpoint contents can be checked exactly.

mod common;

use std::time::Duration;

use alloy::primitives::Address;
use common::{registered, renewed, transfer, RecordingSink, ScriptedSource};
use ens_event_indexer::{
    error::IndexerResult,
    events::{specs_for, EventKind, ENS_BASE_REGISTRAR},
    normalize::CapturedEvent,
    observability::init_test_tracing,
    range::{BlockRange, ScanWindowConfig},
    retry::RetryPolicy,
    scanner::scan,
    sink::{JsonFileSink, QueriedState},
};

fn blocks(state: &QueriedState) -> Vec<u64> {
    state.events().iter().map(CapturedEvent::block).collect()
}

fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(100))
}

/// A window runs all of its chunks' queries at once and nothing from the next
/// window: two full chunks of three kinds overlap six queries, then the last
/// chunk runs alone. With one second per query the scan takes two seconds.
#[tokio::test(start_paused = true)]
async fn test_window_queries_run_concurrently() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![
        registered(3, 1),
        renewed(14, 1),
        transfer(27, Address::repeat_byte(0x33), 1),
    ])
    .with_latency(Duration::from_secs(1));
    let sink = RecordingSink::default();

    let started = tokio::time::Instant::now();
    let state = scan(
        &source,
        BlockRange::new(0, 29)?,
        &ScanWindowConfig::new(10, 2)?,
        &specs_for(ENS_BASE_REGISTRAR, &EventKind::ALL),
        &fast_retry(3),
        &sink,
    )
    .await?;

    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(source.peak_in_flight(), 6);
    assert_eq!(source.queries().len(), 9);
    assert_eq!(sink.snapshots().len(), 2);
    assert_eq!(blocks(&state), vec![3, 14, 27]);
    Ok(())
}

/// Three chunks with a window of two checkpoint twice: after chunks 1-2 and
/// after all three.
#[tokio::test(start_paused = true)]
async fn test_three_chunks_window_of_two() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![
        registered(5, 1),
        registered(15, 2),
        registered(25, 3),
    ]);
    let sink = RecordingSink::default();

    let state = scan(
        &source,
        BlockRange::new(0, 29)?,
        &ScanWindowConfig::new(10, 2)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::NameRegistered]),
        &fast_retry(3),
        &sink,
    )
    .await?;

    let snapshots = sink.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(blocks(&snapshots[0]), vec![5, 15]);
    assert_eq!(blocks(&snapshots[1]), vec![5, 15, 25]);
    assert_eq!(snapshots[1], state);

    let ranges: Vec<_> = source.queries().iter().map(|(_, r)| (r.start(), r.end())).collect();
    assert_eq!(ranges, vec![(0, 9), (10, 19), (20, 29)]);
    Ok(())
}

/// Within a chunk, events are grouped by kind in spec order; chunks keep
/// block order.
#[tokio::test(start_paused = true)]
async fn test_output_order_follows_chunks_then_specs() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![
        transfer(3, Address::repeat_byte(0x33), 1),
        renewed(4, 1),
        registered(7, 2),
        transfer(12, Address::repeat_byte(0x33), 2),
        registered(18, 3),
    ]);
    let sink = RecordingSink::default();

    let state = scan(
        &source,
        BlockRange::new(0, 19)?,
        &ScanWindowConfig::new(10, 5)?,
        &specs_for(ENS_BASE_REGISTRAR, &EventKind::ALL),
        &fast_retry(3),
        &sink,
    )
    .await?;

    let order: Vec<_> = state.events().iter().map(|e| (e.block(), e.kind())).collect();
    assert_eq!(
        order,
        vec![
            (7, EventKind::NameRegistered),
            (4, EventKind::NameRenewed),
            (3, EventKind::Transfer),
            (18, EventKind::NameRegistered),
            (12, EventKind::Transfer),
        ]
    );
    assert_eq!(sink.snapshots().len(), 1);
    Ok(())
}

/// Transient failures are retried and the scan still completes.
#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![registered(12, 1)]).fail_chunk(10, 2);
    let sink = RecordingSink::default();

    let state = scan(
        &source,
        BlockRange::new(0, 19)?,
        &ScanWindowConfig::new(10, 2)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::NameRegistered]),
        &fast_retry(5),
        &sink,
    )
    .await?;

    assert_eq!(blocks(&state), vec![12]);
    // One query for the first chunk, three for the second
    assert_eq!(source.queries().len(), 4);
    Ok(())
}

/// A chunk that exhausts its retries aborts the batch. Checkpoints from
/// earlier windows stay on disk.
#[tokio::test(start_paused = true)]
async fn test_exhausted_chunk_aborts_batch() -> IndexerResult<()> {
    init_test_tracing();
    let dir = tempfile::tempdir().map_err(|e| {
        ens_event_indexer::error::IndexerError::sink("tempdir", Some(Box::new(e)))
    })?;
    let path = dir.path().join("ENS-eth.json");
    let sink = JsonFileSink::new(&path);

    let source = ScriptedSource::with_logs(vec![
        registered(5, 1),
        registered(15, 2),
        registered(25, 3),
        registered(35, 4),
    ])
    .fail_chunk(20, u32::MAX);

    let result = scan(
        &source,
        BlockRange::new(0, 39)?,
        &ScanWindowConfig::new(10, 2)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::NameRegistered]),
        &fast_retry(3),
        &sink,
    )
    .await;

    assert!(matches!(result, Err(ref e) if e.is_exhausted()));

    let on_disk = QueriedState::load(&path)?;
    assert_eq!(blocks(&on_disk), vec![5, 15]);

    let failed_attempts = source
        .queries()
        .iter()
        .filter(|(_, r)| r.start() == 20)
        .count();
    assert_eq!(failed_attempts, 3);
    Ok(())
}

/// A one-block range is a single chunk of one block.
#[tokio::test(start_paused = true)]
async fn test_single_block_range() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![registered(100, 1), registered(101, 2)]);
    let sink = RecordingSink::default();

    let state = scan(
        &source,
        BlockRange::new(100, 100)?,
        &ScanWindowConfig::new(1000, 5)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::NameRegistered]),
        &fast_retry(3),
        &sink,
    )
    .await?;

    assert_eq!(blocks(&state), vec![100]);
    let ranges: Vec<_> = source.queries().iter().map(|(_, r)| (r.start(), r.end())).collect();
    assert_eq!(ranges, vec![(100, 100)]);
    assert_eq!(sink.snapshots().len(), 1);
    Ok(())
}

/// The batch path keeps transfers out of the null address.
#[tokio::test(start_paused = true)]
async fn test_batch_scan_keeps_mint_transfers() -> IndexerResult<()> {
    init_test_tracing();
    let source = ScriptedSource::with_logs(vec![
        transfer(1, Address::ZERO, 7),
        transfer(2, Address::repeat_byte(0x44), 7),
    ]);
    let sink = RecordingSink::default();

    let state = scan(
        &source,
        BlockRange::new(0, 9)?,
        &ScanWindowConfig::new(10, 1)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::Transfer]),
        &fast_retry(1),
        &sink,
    )
    .await?;

    assert_eq!(state.len(), 2);
    assert!(state.events()[0].is_mint());
    assert!(!state.events()[1].is_mint());
    Ok(())
}

/// Token ids wider than 64 bits survive the trip to disk exactly.
#[tokio::test(start_paused = true)]
async fn test_snapshot_preserves_wide_token_ids() -> IndexerResult<()> {
    init_test_tracing();
    let mut wide = registered(3, 0);
    if let Some(ens_event_indexer::events::RawArgs::NameRegistered { id, .. }) = wide.args.as_mut() {
        *id = alloy::primitives::U256::from(u64::MAX) + alloy::primitives::U256::from(1_u64);
    }
    let dir = tempfile::tempdir().map_err(|e| {
        ens_event_indexer::error::IndexerError::sink("tempdir", Some(Box::new(e)))
    })?;
    let path = dir.path().join("wide.json");

    scan(
        &ScriptedSource::with_logs(vec![wide]),
        BlockRange::new(0, 9)?,
        &ScanWindowConfig::new(10, 1)?,
        &specs_for(ENS_BASE_REGISTRAR, &[EventKind::NameRegistered]),
        &fast_retry(1),
        &JsonFileSink::new(&path),
    )
    .await?;

    let loaded = QueriedState::load(&path)?;
    assert_eq!(loaded.events()[0].token_id(), "18446744073709551616");
    Ok(())
}
