//! Error types for the registrar event indexer.
//!
//! This module provides a unified error type [`IndexerError`] covering every
//! failure that can occur while configuring, scanning, normalizing and
//! persisting registrar events.
//!
//! # Design
//!
//! The error hierarchy is organized by layer:
//! - [`IndexerError::ConfigError`]: Configuration and startup validation
//! - [`IndexerError::RpcError`]: A single failed query attempt (always retryable)
//! - [`IndexerError::ExhaustedRetries`]: A query that failed on every attempt
//! - [`IndexerError::DecodingError`]: Raw event normalization failures
//! - [`IndexerError::SinkError`]: Snapshot write/read failures
//! - [`IndexerError::SubscriptionError`]: Live subscription setup failures
//!
//! # Example
//!
//! ```
//! use ens_event_indexer::error::{IndexerError, IndexerResult};
//!
//! fn validate_chunk_size(chunk_size: u64) -> IndexerResult<()> {
//!     if chunk_size == 0 {
//!         return Err(IndexerError::config("chunk size must be positive", None));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

/// Result type alias using [`IndexerError`].
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Boxed error used as the optional cause of an [`IndexerError`].
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the registrar event indexer.
#[derive(Debug)]
pub enum IndexerError {
    /// Configuration or environment errors.
    ///
    /// Raised before any scanning starts: missing variables, unparsable
    /// numbers, `start >= end`, zero chunk size or concurrency.
    ConfigError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// A failed RPC query attempt.
    ///
    /// Every variant of transport failure lands here and is treated as
    /// transient by the retry executor.
    RpcError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// A query failed on every permitted attempt.
    ExhaustedRetries {
        /// Number of attempts made
        attempts: u32,
        /// Error returned by the final attempt
        source: Box<IndexerError>,
    },

    /// Raw event normalization errors.
    ///
    /// Variants include:
    /// - Log missing transaction hash or block number
    /// - Argument bag not matching the declared event kind
    /// - Numeric field out of range
    DecodingError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// Snapshot persistence errors.
    SinkError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },

    /// Live subscription setup errors.
    SubscriptionError {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<BoxedSource>,
    },
}

impl IndexerError {
    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```
    /// use ens_event_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::config("RPC_URL not set", None);
    /// assert!(matches!(err, IndexerError::ConfigError { .. }));
    /// ```
    #[must_use]
    pub fn config(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source,
        }
    }

    /// Create a new RPC error.
    ///
    /// # Example
    ///
    /// ```
    /// use ens_event_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::rpc("eth_getLogs failed", None);
    /// assert!(matches!(err, IndexerError::RpcError { .. }));
    /// ```
    #[must_use]
    pub fn rpc(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::RpcError {
            message: message.into(),
            source,
        }
    }

    /// Create an exhausted-retries error wrapping the last attempt's failure.
    #[must_use]
    pub fn exhausted_retries(attempts: u32, last_error: Self) -> Self {
        Self::ExhaustedRetries {
            attempts,
            source: Box::new(last_error),
        }
    }

    /// Create a new decoding error.
    ///
    /// # Example
    ///
    /// ```
    /// use ens_event_indexer::error::IndexerError;
    ///
    /// let err = IndexerError::decoding("log missing block number", None);
    /// assert!(matches!(err, IndexerError::DecodingError { .. }));
    /// ```
    #[must_use]
    pub fn decoding(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::DecodingError {
            message: message.into(),
            source,
        }
    }

    /// Create a new sink error.
    #[must_use]
    pub fn sink(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::SinkError {
            message: message.into(),
            source,
        }
    }

    /// Create a new subscription error.
    #[must_use]
    pub fn subscription(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::SubscriptionError {
            message: message.into(),
            source,
        }
    }

    /// Whether this error ended a retry loop.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::ExhaustedRetries { .. })
    }
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message, .. } => write!(f, "Configuration error: {message}"),
            Self::RpcError { message, .. } => write!(f, "RPC error: {message}"),
            Self::ExhaustedRetries { attempts, source } => {
                write!(
                    f,
                    "Retries exhausted after {attempts} attempts. Last error: {source}"
                )
            }
            Self::DecodingError { message, .. } => write!(f, "Decoding error: {message}"),
            Self::SinkError { message, .. } => write!(f, "Sink error: {message}"),
            Self::SubscriptionError { message, .. } => {
                write!(f, "Subscription error: {message}")
            }
        }
    }
}

impl std::error::Error for IndexerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigError { source, .. }
            | Self::RpcError { source, .. }
            | Self::DecodingError { source, .. }
            | Self::SinkError { source, .. }
            | Self::SubscriptionError { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &dyn std::error::Error),
            Self::ExhaustedRetries { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Convert from `eyre::Report` to `IndexerError`.
///
/// Used at the CLI edge where `eyre::WrapErr` adds context to I/O failures.
/// The report is categorized as a configuration error.
impl From<eyre::Report> for IndexerError {
    fn from(err: eyre::Report) -> Self {
        Self::ConfigError {
            message: format!("{err:#}"),
            source: None,
        }
    }
}
