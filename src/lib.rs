//! # ENS Registrar Event Indexer
//!
//! Event indexer for the ENS `.eth` base registrar built on
//! [Alloy](https://github.com/alloy-rs/alloy).
//!
//! It extracts `NameRegistered`, `NameRenewed` and `Transfer` events in two
//! modes:
//!
//! - **Range scan**: a historical block range is split into fixed-size chunks,
//!   queried in bounded concurrent windows with per-query retry, and the
//!   accumulated result is checkpointed to a JSON file after every window.
//! - **Live subscription**: new events are pushed by the node, filtered,
//!   normalized and printed as they arrive.
//!
//! ## Architecture
//!
//! 1. **Config Layer** ([`config`]) - Environment variable loading
//! 2. **RPC Layer** ([`rpc`]) - Provider setup and the [`rpc::LogSource`] seam
//! 3. **Events Layer** ([`events`], [`normalize`]) - Decoding and canonical records
//! 4. **Scan Layer** ([`range`], [`retry`], [`chunk`], [`scanner`], [`sink`]) -
//!    Chunking, retry, windowed scanning and checkpoints
//! 5. **Live Layer** ([`subscriber`]) - Push subscriptions
//!
//! ## Using as a Library
//!
//! ```rust,no_run
//! use ens_event_indexer::{
//!     config::Config,
//!     rpc::{connect, AlloyLogSource},
//!     scanner::scan,
//!     sink::JsonFileSink,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let source = AlloyLogSource::new(connect(config.rpc_url()).await?);
//!
//!     let batch = &config.batches()[0];
//!     let state = scan(
//!         &source,
//!         config.scan_range()?,
//!         &config.window(batch)?,
//!         &config.specs(batch),
//!         &config.retry_policy(),
//!         &JsonFileSink::new("dump/ENS-eth.json"),
//!     )
//!     .await?;
//!
//!     println!("Captured {} events", state.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`error::IndexerResult<T>`](error::IndexerResult).

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod observability;
pub mod range;
pub mod retry;
pub mod rpc;
pub mod scanner;
pub mod sink;
pub mod subscriber;
