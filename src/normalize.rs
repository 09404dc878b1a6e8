//! Normalization of raw registrar events into canonical records.
//!
//! [`normalize`] is a pure function: one [`RawEvent`] in, at most one
//! [`CapturedEvent`] out. It is shared by the batch scanner and the live
//! subscriber.
//!
//! ## Number handling
//!
//! Token ids are 256-bit labelhashes and routinely exceed every native
//! integer type, so they are always rendered as base-10 strings straight from
//! the `U256` value. Expiry timestamps must fit in a `u64`.
//!
//! ## Mint transfers
//!
//! The normalizer does not drop `Transfer` events sent from the null address.
//! The live subscriber filters them out before normalizing; the batch scanner
//! keeps them.
//!
//! ## Example
//!
//! ```
//! use alloy::primitives::{Address, B256, U256};
//! use ens_event_indexer::events::{EventKind, RawArgs, RawEvent};
//! use ens_event_indexer::normalize::{normalize, CapturedEvent};
//!
//! # fn example() -> ens_event_indexer::error::IndexerResult<()> {
//! let raw = RawEvent {
//!     kind: EventKind::NameRenewed,
//!     tx_hash: Some(B256::ZERO),
//!     block_number: Some(12_000_000),
//!     log_index: Some(0),
//!     args: Some(RawArgs::NameRenewed {
//!         id: U256::from(18_446_744_073_709_551_616_u128),
//!         expires: U256::from(1_900_000_000_u64),
//!     }),
//! };
//! let event = normalize(&raw)?.expect("decodable");
//! assert_eq!(event.token_id(), "18446744073709551616");
//! # Ok(())
//! # }
//! ```

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, IndexerResult};
use crate::events::{EventKind, RawArgs, RawEvent};

/// Canonical, source-independent record of one registrar event.
///
/// Serialized with an `event` tag and camelCase fields, e.g.
/// `{"event":"NameRenewed","txHash":"0x..","block":1,"tokenId":"42","expires":1900000000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum CapturedEvent {
    /// A first-time registration.
    NameRegistered {
        /// Transaction hash, `0x`-prefixed hex
        tx_hash: String,
        /// Block height
        block: u64,
        /// Token id as a decimal string
        token_id: String,
        /// Checksummed owner address
        owner: String,
        /// Expiry as Unix seconds
        expires: u64,
    },
    /// A registration extension.
    NameRenewed {
        /// Transaction hash, `0x`-prefixed hex
        tx_hash: String,
        /// Block height
        block: u64,
        /// Token id as a decimal string
        token_id: String,
        /// New expiry as Unix seconds
        expires: u64,
    },
    /// An ownership transfer.
    Transfer {
        /// Transaction hash, `0x`-prefixed hex
        tx_hash: String,
        /// Block height
        block: u64,
        /// Token id as a decimal string
        token_id: String,
        /// Checksummed previous owner
        from: String,
        /// Checksummed new owner
        to: String,
    },
}

impl CapturedEvent {
    /// Kind of the record.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::NameRegistered { .. } => EventKind::NameRegistered,
            Self::NameRenewed { .. } => EventKind::NameRenewed,
            Self::Transfer { .. } => EventKind::Transfer,
        }
    }

    /// Block height the event was emitted in.
    #[must_use]
    pub const fn block(&self) -> u64 {
        match self {
            Self::NameRegistered { block, .. }
            | Self::NameRenewed { block, .. }
            | Self::Transfer { block, .. } => *block,
        }
    }

    /// Transaction hash.
    #[must_use]
    pub fn tx_hash(&self) -> &str {
        match self {
            Self::NameRegistered { tx_hash, .. }
            | Self::NameRenewed { tx_hash, .. }
            | Self::Transfer { tx_hash, .. } => tx_hash,
        }
    }

    /// Token id as a decimal string.
    #[must_use]
    pub fn token_id(&self) -> &str {
        match self {
            Self::NameRegistered { token_id, .. }
            | Self::NameRenewed { token_id, .. }
            | Self::Transfer { token_id, .. } => token_id,
        }
    }

    /// True for a transfer out of the null address.
    #[must_use]
    pub fn is_mint(&self) -> bool {
        match self {
            Self::Transfer { from, .. } => from.parse::<Address>().is_ok_and(|a| a.is_zero()),
            _ => false,
        }
    }
}

/// Normalize one raw event.
///
/// Returns `Ok(None)` when the raw event carries no decodable arguments.
///
/// # Errors
///
/// Returns a decoding error if the event lacks a transaction hash or block
/// number, if its arguments belong to another kind, or if `expires` does not
/// fit in a `u64`.
pub fn normalize(raw: &RawEvent) -> IndexerResult<Option<CapturedEvent>> {
    let Some(args) = &raw.args else {
        return Ok(None);
    };

    let tx_hash = raw
        .tx_hash
        .map(|hash| hash.to_string())
        .ok_or_else(|| {
            IndexerError::decoding(format!("{} log missing transaction hash", raw.kind), None)
        })?;
    let block = raw
        .block_number
        .ok_or_else(|| {
            IndexerError::decoding(format!("{} log missing block number", raw.kind), None)
        })?;

    let event = match (raw.kind, args) {
        (EventKind::NameRegistered, RawArgs::NameRegistered { id, owner, expires }) => {
            CapturedEvent::NameRegistered {
                tx_hash,
                block,
                token_id: id.to_string(),
                owner: checksummed(*owner),
                expires: expiry_seconds(*expires)?,
            }
        }
        (EventKind::NameRenewed, RawArgs::NameRenewed { id, expires }) => {
            CapturedEvent::NameRenewed {
                tx_hash,
                block,
                token_id: id.to_string(),
                expires: expiry_seconds(*expires)?,
            }
        }
        (EventKind::Transfer, RawArgs::Transfer { from, to, token_id }) => {
            CapturedEvent::Transfer {
                tx_hash,
                block,
                token_id: token_id.to_string(),
                from: checksummed(*from),
                to: checksummed(*to),
            }
        }
        (kind, other) => {
            return Err(IndexerError::decoding(
                format!("{kind} event carries mismatched arguments: {other:?}"),
                None,
            ));
        }
    };

    Ok(Some(event))
}

fn checksummed(address: Address) -> String {
    address.to_checksum(None)
}

fn expiry_seconds(expires: U256) -> IndexerResult<u64> {
    u64::try_from(expires).map_err(|_| {
        IndexerError::decoding(
            format!("expiry {expires} does not fit in a Unix timestamp"),
            None,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ZERO_ADDRESS;
    use alloy::primitives::{address, b256, B256};

    const TX: B256 = b256!("1111111111111111111111111111111111111111111111111111111111111111");
    const OWNER: Address = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");

    fn raw(kind: EventKind, args: Option<RawArgs>) -> RawEvent {
        RawEvent {
            kind,
            tx_hash: Some(TX),
            block_number: Some(9_380_471),
            log_index: Some(0),
            args,
        }
    }

    #[test]
    fn test_token_id_above_u64_is_exact() {
        let id = U256::from(u64::MAX) + U256::from(1_u64);
        let event = normalize(&raw(
            EventKind::NameRenewed,
            Some(RawArgs::NameRenewed {
                id,
                expires: U256::from(1_900_000_000_u64),
            }),
        ));
        assert!(matches!(
            event,
            Ok(Some(ref e)) if e.token_id() == "18446744073709551616"
        ));
    }

    #[test]
    fn test_full_width_token_id() {
        let event = normalize(&raw(
            EventKind::Transfer,
            Some(RawArgs::Transfer {
                from: OWNER,
                to: OWNER,
                token_id: U256::MAX,
            }),
        ));
        assert!(matches!(
            event,
            Ok(Some(ref e)) if e.token_id()
                == "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        ));
    }

    #[test]
    fn test_name_registered_fields() {
        let event = normalize(&raw(
            EventKind::NameRegistered,
            Some(RawArgs::NameRegistered {
                id: U256::from(5_u64),
                owner: OWNER,
                expires: U256::from(1_611_000_000_u64),
            }),
        ));
        let expected = CapturedEvent::NameRegistered {
            tx_hash: format!("{TX}"),
            block: 9_380_471,
            token_id: "5".to_string(),
            owner: "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string(),
            expires: 1_611_000_000,
        };
        assert!(matches!(event, Ok(Some(ref e)) if *e == expected));
    }

    #[test]
    fn test_mint_transfer_is_not_filtered_here() {
        let event = normalize(&raw(
            EventKind::Transfer,
            Some(RawArgs::Transfer {
                from: ZERO_ADDRESS,
                to: OWNER,
                token_id: U256::from(9_u64),
            }),
        ));
        assert!(matches!(
            event,
            Ok(Some(CapturedEvent::Transfer { ref from, .. }))
                if from == "0x0000000000000000000000000000000000000000"
        ));
    }

    #[test]
    fn test_missing_args_is_skipped() {
        assert!(matches!(normalize(&raw(EventKind::Transfer, None)), Ok(None)));
    }

    #[test]
    fn test_missing_block_number_is_error() {
        let mut event = raw(
            EventKind::NameRenewed,
            Some(RawArgs::NameRenewed {
                id: U256::from(1_u64),
                expires: U256::from(1_u64),
            }),
        );
        event.block_number = None;
        assert!(matches!(
            normalize(&event),
            Err(IndexerError::DecodingError { .. })
        ));
    }

    #[test]
    fn test_mismatched_args_is_error() {
        let event = raw(
            EventKind::NameRegistered,
            Some(RawArgs::NameRenewed {
                id: U256::from(1_u64),
                expires: U256::from(1_u64),
            }),
        );
        assert!(normalize(&event).is_err());
    }

    #[test]
    fn test_expiry_overflow_is_error() {
        let event = raw(
            EventKind::NameRenewed,
            Some(RawArgs::NameRenewed {
                id: U256::from(1_u64),
                expires: U256::from(u64::MAX) + U256::from(1_u64),
            }),
        );
        assert!(normalize(&event).is_err());
    }

    #[test]
    fn test_json_shape() {
        let event = CapturedEvent::NameRenewed {
            tx_hash: "0xab".to_string(),
            block: 7,
            token_id: "18446744073709551616".to_string(),
            expires: 1_900_000_000,
        };
        let json = serde_json::to_value(&event).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "event": "NameRenewed",
                "txHash": "0xab",
                "block": 7,
                "tokenId": "18446744073709551616",
                "expires": 1_900_000_000_u64,
            }))
        );
    }
}
