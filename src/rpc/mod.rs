//! RPC access to the chain node.
//!
//! # Layers
//!
//! - **Provider** ([`provider`]): connection setup and chain-head queries
//! - **Source** ([`source`]): the [`LogSource`] seam used by the scanner and
//!   the live subscriber, with its Alloy-backed implementation
//!
//! ```text
//! RangeScanner ─┐                 ┌─ eth_getLogs   (batch)
//!               ├─ AlloyLogSource ┤
//! LiveSubscriber┘                 └─ eth_subscribe (live)
//! ```

pub mod provider;
pub mod source;

pub use provider::{check_connection, connect, get_latest_block, Provider};
pub use source::{AlloyLogSource, LogSource, RawEventStream};
