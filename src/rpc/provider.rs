//! Provider construction for Ethereum connections.
//!
//! The indexer talks to a single node through Alloy's builtin transport
//! selection, so `RPC_URL` may be either an HTTP(S) or a WS(S) endpoint. Live
//! subscriptions require a WebSocket endpoint.
//!
//! ## Example
//!
//! ```no_run
//! use ens_event_indexer::rpc::{connect, get_latest_block};
//! use ens_event_indexer::error::IndexerResult;
//!
//! # async fn example() -> IndexerResult<()> {
//! let provider = connect("wss://eth-mainnet.g.alchemy.com/v2/API_KEY").await?;
//! let latest_block = get_latest_block(&provider).await?;
//! println!("Latest block: {}", latest_block);
//! # Ok(())
//! # }
//! ```

use alloy::providers::{Provider as AlloyProvider, ProviderBuilder, RootProvider};
use alloy::transports::BoxTransport;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IndexerError, IndexerResult};

/// Provider over whichever transport the URL selects.
pub type Provider = RootProvider<BoxTransport>;

/// Connect to an Ethereum node.
///
/// # Errors
///
/// Returns an error if the URL scheme is unsupported or the connection
/// cannot be established.
#[instrument(skip(rpc_url), fields(rpc_host = tracing::field::Empty, duration_ms = tracing::field::Empty))]
pub async fn connect(rpc_url: &str) -> IndexerResult<Provider> {
    // Keep API keys out of the logs
    let host = rpc_url.split("/v2/").next().unwrap_or("unknown");
    tracing::Span::current().record("rpc_host", host);
    info!(rpc_host = host, "Connecting to RPC endpoint");

    let start = std::time::Instant::now();
    let provider = ProviderBuilder::new()
        .on_builtin(rpc_url)
        .await
        .map_err(|e| {
            error!(error = %e, rpc_host = host, "RPC connection failed");
            let msg = if rpc_url.starts_with("http") || rpc_url.starts_with("ws") {
                format!("Failed to connect to RPC endpoint '{host}'")
            } else {
                format!(
                    "Invalid RPC URL '{host}'. Expected an http(s):// or ws(s):// endpoint, e.g. 'wss://eth-mainnet.g.alchemy.com/v2/YOUR_KEY'"
                )
            };
            IndexerError::config(msg, Some(Box::new(e)))
        })?;

    let duration = start.elapsed();
    tracing::Span::current().record("duration_ms", duration.as_millis() as u64);
    info!(
        rpc_host = host,
        duration_ms = duration.as_millis(),
        "RPC provider connected"
    );

    Ok(provider)
}

/// Get the latest block number from the node.
///
/// # Errors
///
/// Returns an RPC error if the request fails.
#[instrument(skip(provider), fields(block = tracing::field::Empty))]
pub async fn get_latest_block(provider: &Provider) -> IndexerResult<u64> {
    debug!("Fetching latest block number");

    let block_number = provider
        .get_block_number()
        .await
        .map_err(|e| IndexerError::rpc("Failed to fetch latest block number", Some(Box::new(e))))?;

    tracing::Span::current().record("block", block_number);
    info!(block = block_number, "Latest block fetched");

    Ok(block_number)
}

/// Check the connection by fetching the chain head.
///
/// # Errors
///
/// Returns an RPC error if the node cannot be reached.
#[instrument(skip(provider))]
pub async fn check_connection(provider: &Provider) -> IndexerResult<u64> {
    debug!("Checking provider connection health");

    match get_latest_block(provider).await {
        Ok(block) => {
            info!(block = block, "Connection check successful");
            Ok(block)
        }
        Err(e) => {
            warn!(error = %e, "Connection check failed");
            Err(IndexerError::rpc(
                format!("Provider connection health check failed: {e}"),
                None,
            ))
        }
    }
}
