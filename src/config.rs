//! Runtime configuration for the indexer.
//!
//! Configuration comes from environment variables, optionally loaded from a
//! `.env` file with `dotenvy`.
//!
//! ## Environment Variables
//!
//! Required:
//! - `RPC_URL`: HTTP(S) or WS(S) endpoint of an Ethereum node
//!
//! Required for `scan`:
//! - `START_BLOCK_HEIGHT`: first block to scan (inclusive)
//! - `END_BLOCK_HEIGHT`: last block to scan (inclusive)
//!
//! Optional (with defaults):
//! - `REGISTER_ADDRESSES`: registrar contract (default: ENS `.eth` base registrar)
//! - `QUERY_CHUNK_BLOCK_COUNT`: blocks per chunk (default: 1000)
//! - `MAX_CONCURRENCY`: chunks in flight per window (default: 5)
//! - `DUMP_DIRECTORY`: snapshot directory (default: `dump/`)
//! - `BATCH_NAME`: label of the scan batch (default: `ENS .eth querying`)
//! - `BATCH_FILE_NAME`: snapshot file name (default: `ENS-eth.json`)
//! - `SCAN_EVENT_KINDS`: comma-separated event kinds (default: all three)
//! - `MAX_RETRY_ATTEMPTS`: attempts per query (default: 1000)
//! - `RETRY_DELAY_MS`: pause between attempts (default: 100)
//! - `QUERY_TIMEOUT_SECS`: per-attempt timeout (default: none)
//!
//! ## Multiple batches
//!
//! `BATCH_NAME`/`BATCH_FILE_NAME` describe a single batch. Several batches
//! can be declared instead with numbered variables, starting at 1:
//!
//! - `BATCH_<n>_NAME`: batch label (numbering stops at the first gap)
//! - `BATCH_<n>_FILE_NAME`: snapshot file name, required and unique
//! - `BATCH_<n>_EVENT_KINDS`: event kinds (default: `SCAN_EVENT_KINDS`)
//! - `BATCH_<n>_MAX_CONCURRENCY`: window width (default: `MAX_CONCURRENCY`)
//!
//! ## Example
//!
//! ```no_run
//! use ens_event_indexer::config::Config;
//! use ens_event_indexer::error::IndexerResult;
//!
//! # fn main() -> IndexerResult<()> {
//! let config = Config::from_env()?;
//! let range = config.scan_range()?;
//! println!("Scanning {range} via {}", config.rpc_url());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::error::{IndexerError, IndexerResult};
use crate::events::{specs_for, EventKind, EventKindSpec, ENS_BASE_REGISTRAR};
use crate::range::{BlockRange, ScanWindowConfig};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

const DEFAULT_CHUNK_BLOCK_COUNT: u64 = 1000;
const DEFAULT_MAX_CONCURRENCY: usize = 5;
const DEFAULT_DUMP_DIRECTORY: &str = "dump/";
const DEFAULT_BATCH_NAME: &str = "ENS .eth querying";
const DEFAULT_BATCH_FILE_NAME: &str = "ENS-eth.json";

/// One named scan batch: which kinds to scan and where to dump them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    name: String,
    file_name: String,
    max_concurrency: usize,
    kinds: Vec<EventKind>,
}

impl BatchConfig {
    /// Human-readable batch label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot file name inside the dump directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Window width for this batch.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Event kinds scanned, in output order.
    #[must_use]
    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }
}

/// Main configuration struct for the indexer.
#[derive(Debug, Clone)]
pub struct Config {
    rpc_url: String,
    contract: Address,
    start_block: Option<u64>,
    end_block: Option<u64>,
    chunk_block_count: u64,
    dump_directory: PathBuf,
    batches: Vec<BatchConfig>,
    max_retry_attempts: u32,
    retry_delay: Duration,
    query_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `RPC_URL` is missing or any variable
    /// fails to parse.
    pub fn from_env() -> IndexerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_vars<F>(lookup: F) -> IndexerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rpc_url = var("RPC_URL")
            .ok_or_else(|| IndexerError::config("RPC_URL environment variable is required", None))?;

        let contract = parsed(&var, "REGISTER_ADDRESSES")?.unwrap_or(ENS_BASE_REGISTRAR);
        let start_block = parsed(&var, "START_BLOCK_HEIGHT")?;
        let end_block = parsed(&var, "END_BLOCK_HEIGHT")?;

        let chunk_block_count =
            parsed(&var, "QUERY_CHUNK_BLOCK_COUNT")?.unwrap_or(DEFAULT_CHUNK_BLOCK_COUNT);
        if chunk_block_count == 0 {
            return Err(IndexerError::config(
                "QUERY_CHUNK_BLOCK_COUNT must be at least 1",
                None,
            ));
        }

        let max_concurrency = parsed(&var, "MAX_CONCURRENCY")?.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(IndexerError::config("MAX_CONCURRENCY must be at least 1", None));
        }

        let dump_directory = var("DUMP_DIRECTORY")
            .unwrap_or_else(|| DEFAULT_DUMP_DIRECTORY.to_string())
            .into();

        let kinds = match var("SCAN_EVENT_KINDS") {
            Some(list) => event_kinds("SCAN_EVENT_KINDS", &list)?,
            None => EventKind::ALL.to_vec(),
        };

        let batches = indexed_batches(&var, max_concurrency, &kinds)?;
        let batches = if batches.is_empty() {
            vec![BatchConfig {
                name: var("BATCH_NAME").unwrap_or_else(|| DEFAULT_BATCH_NAME.to_string()),
                file_name: var("BATCH_FILE_NAME")
                    .unwrap_or_else(|| DEFAULT_BATCH_FILE_NAME.to_string()),
                max_concurrency,
                kinds,
            }]
        } else {
            batches
        };

        let max_retry_attempts =
            parsed(&var, "MAX_RETRY_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let retry_delay = parsed(&var, "RETRY_DELAY_MS")?
            .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis);
        let query_timeout = parsed(&var, "QUERY_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Self {
            rpc_url,
            contract,
            start_block,
            end_block,
            chunk_block_count,
            dump_directory,
            batches,
            max_retry_attempts,
            retry_delay,
            query_timeout,
        })
    }

    /// Node endpoint.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Registrar contract address.
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// Blocks per chunk.
    #[must_use]
    pub const fn chunk_block_count(&self) -> u64 {
        self.chunk_block_count
    }

    /// Directory snapshots are written to.
    #[must_use]
    pub fn dump_directory(&self) -> &Path {
        &self.dump_directory
    }

    /// Configured batches, in run order.
    #[must_use]
    pub fn batches(&self) -> &[BatchConfig] {
        &self.batches
    }

    /// Override the configured scan bounds.
    #[must_use]
    pub fn with_bounds(mut self, start: Option<u64>, end: Option<u64>) -> Self {
        if let Some(start) = start {
            self.start_block = Some(start);
        }
        if let Some(end) = end {
            self.end_block = Some(end);
        }
        self
    }

    /// The block range to scan.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either bound is missing or the start
    /// is not strictly below the end.
    pub fn scan_range(&self) -> IndexerResult<BlockRange> {
        let start = self
            .start_block
            .ok_or_else(|| IndexerError::config("START_BLOCK_HEIGHT is required for scanning", None))?;
        let end = self
            .end_block
            .ok_or_else(|| IndexerError::config("END_BLOCK_HEIGHT is required for scanning", None))?;

        if start >= end {
            return Err(IndexerError::config(
                format!("START_BLOCK_HEIGHT ({start}) has to be smaller than END_BLOCK_HEIGHT ({end})"),
                None,
            ));
        }
        BlockRange::new(start, end)
    }

    /// Window settings for `batch`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero chunk size or concurrency.
    pub fn window(&self, batch: &BatchConfig) -> IndexerResult<ScanWindowConfig> {
        ScanWindowConfig::new(self.chunk_block_count, batch.max_concurrency)
    }

    /// Event specs for `batch`, bound to the configured contract.
    #[must_use]
    pub fn specs(&self, batch: &BatchConfig) -> Vec<EventKindSpec> {
        specs_for(self.contract, &batch.kinds)
    }

    /// Specs for every kind, as used by the live subscriber.
    #[must_use]
    pub fn all_specs(&self) -> Vec<EventKindSpec> {
        specs_for(self.contract, &EventKind::ALL)
    }

    /// Retry policy for ranged queries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry_attempts, self.retry_delay)
            .with_attempt_timeout(self.query_timeout)
    }
}

/// Batches declared as `BATCH_1_NAME`, `BATCH_2_NAME`, ... in order.
///
/// Numbering starts at 1 and stops at the first missing name. Each indexed
/// batch needs its own `BATCH_<n>_FILE_NAME`; kinds and concurrency fall back
/// to `SCAN_EVENT_KINDS` and `MAX_CONCURRENCY`.
fn indexed_batches<F>(
    var: &F,
    default_concurrency: usize,
    default_kinds: &[EventKind],
) -> IndexerResult<Vec<BatchConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut batches: Vec<BatchConfig> = Vec::new();

    for n in 1.. {
        let Some(name) = var(&format!("BATCH_{n}_NAME")) else {
            break;
        };

        let file_key = format!("BATCH_{n}_FILE_NAME");
        let file_name = var(&file_key).ok_or_else(|| {
            IndexerError::config(format!("{file_key} is required for batch '{name}'"), None)
        })?;
        if batches.iter().any(|b| b.file_name == file_name) {
            return Err(IndexerError::config(
                format!("{file_key} '{file_name}' is already used by another batch"),
                None,
            ));
        }

        let concurrency_key = format!("BATCH_{n}_MAX_CONCURRENCY");
        let max_concurrency = parsed(var, &concurrency_key)?.unwrap_or(default_concurrency);
        if max_concurrency == 0 {
            return Err(IndexerError::config(
                format!("{concurrency_key} must be at least 1"),
                None,
            ));
        }

        let kinds_key = format!("BATCH_{n}_EVENT_KINDS");
        let kinds = match var(&kinds_key) {
            Some(list) => event_kinds(&kinds_key, &list)?,
            None => default_kinds.to_vec(),
        };

        batches.push(BatchConfig {
            name,
            file_name,
            max_concurrency,
            kinds,
        });
    }

    Ok(batches)
}

fn event_kinds(key: &str, list: &str) -> IndexerResult<Vec<EventKind>> {
    let kinds = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(EventKind::from_str)
        .collect::<IndexerResult<Vec<_>>>()?;
    if kinds.is_empty() {
        return Err(IndexerError::config(
            format!("{key} must name at least one event"),
            None,
        ));
    }
    Ok(kinds)
}

fn parsed<T, F>(var: &F, key: &str) -> IndexerResult<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                IndexerError::config(format!("{key} has an invalid value '{raw}'"), Some(Box::new(e)))
            })
        })
        .transpose()
}
