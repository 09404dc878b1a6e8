//! Block intervals and their partitioning into query chunks.
//!
//! A [`BlockRange`] is an inclusive, immutable interval of block heights.
//! [`BlockRange::chunks`] splits it into consecutive, non-overlapping
//! sub-ranges of at most `chunk_size` blocks, the last one clipped to the
//! range end.
//!
//! ```
//! use ens_event_indexer::range::BlockRange;
//!
//! # fn example() -> ens_event_indexer::error::IndexerResult<()> {
//! let range = BlockRange::new(0, 2_499)?;
//! let chunks: Vec<_> = range.chunks(1_000).collect();
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[2].start(), 2_000);
//! assert_eq!(chunks[2].end(), 2_499);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexerError, IndexerResult};

/// Inclusive block interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRange {
    start: u64,
    end: u64,
}

impl BlockRange {
    /// Create a range covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `end < start`.
    pub fn new(start: u64, end: u64) -> IndexerResult<Self> {
        if end < start {
            return Err(IndexerError::config(
                format!("block range end {end} is before start {start}"),
                None,
            ));
        }
        Ok(Self { start, end })
    }

    /// First block of the range (inclusive).
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last block of the range (inclusive).
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of blocks covered. Wider than `u64` so the full-width range
    /// `0..=u64::MAX` is counted exactly.
    #[must_use]
    pub const fn len(&self) -> u128 {
        (self.end - self.start) as u128 + 1
    }

    /// Always false: a range holds at least one block.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over consecutive sub-ranges of at most `chunk_size` blocks.
    ///
    /// A `chunk_size` of zero is treated as one.
    #[must_use]
    pub fn chunks(&self, chunk_size: u64) -> ChunkIter {
        ChunkIter::new(*self, chunk_size)
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Iterator yielding the chunks of a [`BlockRange`] in ascending order.
#[derive(Debug, Clone)]
pub struct ChunkIter {
    current: u64,
    end: u64,
    chunk_size: u64,
    yielded: u128,
    total: u128,
}

impl ChunkIter {
    fn new(range: BlockRange, chunk_size: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            current: range.start,
            end: range.end,
            chunk_size,
            yielded: 0,
            total: u128::from((range.end - range.start) / chunk_size) + 1,
        }
    }
}

impl Iterator for ChunkIter {
    type Item = BlockRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded >= self.total {
            return None;
        }

        self.yielded += 1;
        let chunk_start = self.current;
        let chunk_end = chunk_start
            .saturating_add(self.chunk_size - 1)
            .min(self.end);
        self.current = chunk_end.saturating_add(1);

        debug!(
            chunk = self.yielded,
            total = self.total,
            start = chunk_start,
            end = chunk_end,
            "Next chunk"
        );
        Some(BlockRange {
            start: chunk_start,
            end: chunk_end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.yielded).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}

/// Chunking and concurrency settings for a range scan.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindowConfig {
    chunk_size: u64,
    max_concurrency: usize,
}

impl ScanWindowConfig {
    /// Create a window config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either value is zero.
    pub fn new(chunk_size: u64, max_concurrency: usize) -> IndexerResult<Self> {
        if chunk_size == 0 {
            return Err(IndexerError::config("chunk size must be greater than 0", None));
        }
        if max_concurrency == 0 {
            return Err(IndexerError::config(
                "max concurrency must be greater than 0",
                None,
            ));
        }
        Ok(Self {
            chunk_size,
            max_concurrency,
        })
    }

    /// Blocks per chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Chunks in flight before the window is awaited and flushed.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}
