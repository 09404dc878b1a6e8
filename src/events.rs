//! Registrar event definitions, filters and raw log decoding.
//!
//! The three events indexed here are emitted by the ENS `.eth` base
//! registrar (an ERC-721 contract):
//!
//! - `NameRegistered(uint256 indexed id, address indexed owner, uint256 expires)`
//! - `NameRenewed(uint256 indexed id, uint256 expires)`
//! - `Transfer(address indexed from, address indexed to, uint256 indexed tokenId)`
//!
//! Event signatures come from Alloy's `sol!` macro, so topic hashes and
//! argument decoding are checked at compile time. Which events a batch scans
//! is described by a list of [`EventKindSpec`] values; each one pairs a closed
//! [`EventKind`] with the log filter used to fetch it.
//!
//! A log fetched from the node is turned into a [`RawEvent`] before
//! normalization. Logs that fail to decode keep their position metadata but
//! carry no arguments, and are skipped by the normalizer.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{address, Address, B256, U256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use tracing::debug;

use crate::error::{IndexerError, IndexerResult};
use crate::normalize::{normalize, CapturedEvent};
use crate::range::BlockRange;

sol! {
    interface IBaseRegistrar {
        /// Emitted when a name is registered for the first time (a mint).
        event NameRegistered(uint256 indexed id, address indexed owner, uint256 expires);

        /// Emitted when a registration is extended.
        event NameRenewed(uint256 indexed id, uint256 expires);

        /// ERC-721 ownership transfer. Mints appear with `from == address(0)`.
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

pub use IBaseRegistrar::{NameRegistered, NameRenewed, Transfer};

/// ENS `.eth` base registrar on Ethereum mainnet.
pub const ENS_BASE_REGISTRAR: Address = address!("57f1887a8BF19b14fC0dF6Fd9B2acc9Af147eA85");

/// Null address used as the `from` of mint transfers.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// The closed set of registrar events this indexer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `NameRegistered`
    NameRegistered,
    /// `NameRenewed`
    NameRenewed,
    /// `Transfer`
    Transfer,
}

impl EventKind {
    /// Every kind, in the default scan order.
    pub const ALL: [Self; 3] = [Self::NameRegistered, Self::NameRenewed, Self::Transfer];

    /// Solidity event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NameRegistered => "NameRegistered",
            Self::NameRenewed => "NameRenewed",
            Self::Transfer => "Transfer",
        }
    }

    /// Keccak hash of the event signature (`topic0`).
    #[must_use]
    pub const fn signature_hash(self) -> B256 {
        match self {
            Self::NameRegistered => NameRegistered::SIGNATURE_HASH,
            Self::NameRenewed => NameRenewed::SIGNATURE_HASH,
            Self::Transfer => Transfer::SIGNATURE_HASH,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                IndexerError::config(
                    format!(
                        "unknown event kind '{s}', expected one of NameRegistered, NameRenewed, Transfer"
                    ),
                    None,
                )
            })
    }
}

/// One event kind to scan, with the filter selecting its logs.
#[derive(Debug, Clone)]
pub struct EventKindSpec {
    kind: EventKind,
    contract: Address,
    filter: Filter,
}

impl EventKindSpec {
    /// Build a spec for `kind` emitted by `contract`.
    #[must_use]
    pub fn new(kind: EventKind, contract: Address) -> Self {
        let filter = Filter::new()
            .address(contract)
            .event_signature(kind.signature_hash());
        Self {
            kind,
            contract,
            filter,
        }
    }

    /// The event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Contract emitting the events.
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// Unbounded filter, as used for live subscriptions.
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Filter restricted to `range` (both ends inclusive).
    #[must_use]
    pub fn ranged_filter(&self, range: BlockRange) -> Filter {
        self.filter
            .clone()
            .from_block(range.start())
            .to_block(range.end())
    }

    /// Normalize a raw event of this spec's kind.
    ///
    /// # Errors
    ///
    /// Returns a decoding error if the raw event belongs to another kind or
    /// cannot be normalized.
    pub fn normalize(&self, raw: &RawEvent) -> IndexerResult<Option<CapturedEvent>> {
        if raw.kind != self.kind {
            return Err(IndexerError::decoding(
                format!("{} event delivered to the {} spec", raw.kind, self.kind),
                None,
            ));
        }
        normalize(raw)
    }
}

/// Specs for `kinds` on a single contract, keeping the given order.
#[must_use]
pub fn specs_for(contract: Address, kinds: &[EventKind]) -> Vec<EventKindSpec> {
    kinds
        .iter()
        .map(|&kind| EventKindSpec::new(kind, contract))
        .collect()
}

/// Decoded arguments of a registrar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArgs {
    /// Arguments of `NameRegistered`.
    NameRegistered {
        /// Token id (labelhash of the name)
        id: U256,
        /// New owner
        owner: Address,
        /// Expiry timestamp
        expires: U256,
    },
    /// Arguments of `NameRenewed`.
    NameRenewed {
        /// Token id
        id: U256,
        /// New expiry timestamp
        expires: U256,
    },
    /// Arguments of `Transfer`.
    Transfer {
        /// Previous owner, zero for mints
        from: Address,
        /// New owner
        to: Address,
        /// Token id
        token_id: U256,
    },
}

/// A log as delivered by the node, tagged with the kind it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Kind the log was requested as.
    pub kind: EventKind,
    /// Transaction hash, absent for pending logs.
    pub tx_hash: Option<B256>,
    /// Block height, absent for pending logs.
    pub block_number: Option<u64>,
    /// Position of the log within its block.
    pub log_index: Option<u64>,
    /// Decoded arguments, `None` when the log did not decode as `kind`.
    pub args: Option<RawArgs>,
}

impl RawEvent {
    /// Decode an RPC log as an event of `kind`.
    ///
    /// Decoding failures are not errors: the returned event simply carries no
    /// arguments.
    #[must_use]
    pub fn from_log(kind: EventKind, log: &Log) -> Self {
        let args = match kind {
            EventKind::NameRegistered => NameRegistered::decode_log(&log.inner, true)
                .map(|decoded| RawArgs::NameRegistered {
                    id: decoded.data.id,
                    owner: decoded.data.owner,
                    expires: decoded.data.expires,
                })
                .map_err(|e| e.to_string()),
            EventKind::NameRenewed => NameRenewed::decode_log(&log.inner, true)
                .map(|decoded| RawArgs::NameRenewed {
                    id: decoded.data.id,
                    expires: decoded.data.expires,
                })
                .map_err(|e| e.to_string()),
            EventKind::Transfer => Transfer::decode_log(&log.inner, true)
                .map(|decoded| RawArgs::Transfer {
                    from: decoded.data.from,
                    to: decoded.data.to,
                    token_id: decoded.data.tokenId,
                })
                .map_err(|e| e.to_string()),
        };

        let args = match args {
            Ok(args) => Some(args),
            Err(reason) => {
                debug!(
                    kind = %kind,
                    tx_hash = ?log.transaction_hash,
                    reason = %reason,
                    "Log did not decode, keeping it without arguments"
                );
                None
            }
        };

        Self {
            kind,
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
            log_index: log.log_index,
            args,
        }
    }

    /// True for a `Transfer` out of the null address.
    #[must_use]
    pub fn is_mint_transfer(&self) -> bool {
        matches!(self.args, Some(RawArgs::Transfer { from, .. }) if from == ZERO_ADDRESS)
    }
}
