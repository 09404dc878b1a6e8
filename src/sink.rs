//! Accumulated scan state and its durable JSON snapshots.
//!
//! A batch accumulates every normalized event into a [`QueriedState`]. At
//! each checkpoint the complete state is handed to a [`DurableSink`], which
//! replaces whatever it held before; a sink never receives a diff.
//!
//! The file sink writes `{"queriedState": [...]}` pretty-printed, the same
//! document on every flush, growing until the batch completes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk::ScannedChunk;
use crate::error::{IndexerError, IndexerResult};
use crate::normalize::CapturedEvent;

/// Every event captured so far by one batch, in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueriedState {
    queried_state: Vec<CapturedEvent>,
}

impl QueriedState {
    /// Empty state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queried_state: Vec::new(),
        }
    }

    /// Append a chunk's events after everything captured so far.
    pub fn append(&mut self, chunk: ScannedChunk) {
        self.queried_state.extend(chunk.events);
    }

    /// Captured events.
    #[must_use]
    pub fn events(&self) -> &[CapturedEvent] {
        &self.queried_state
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queried_state.len()
    }

    /// True when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queried_state.is_empty()
    }

    /// Load a snapshot previously written by [`JsonFileSink`].
    ///
    /// # Errors
    ///
    /// Returns a sink error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> IndexerResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            IndexerError::sink(
                format!("Failed to read snapshot {}", path.display()),
                Some(Box::new(e)),
            )
        })?;

        let state: Self = serde_json::from_str(&json).map_err(|e| {
            IndexerError::sink(
                format!("Failed to parse snapshot {}", path.display()),
                Some(Box::new(e)),
            )
        })?;

        debug!(path = %path.display(), events = state.len(), "Snapshot loaded");
        Ok(state)
    }
}

/// Destination for state checkpoints.
pub trait DurableSink {
    /// Replace the stored snapshot with `state`.
    ///
    /// # Errors
    ///
    /// Returns a sink error if the snapshot could not be stored. Scanners
    /// log the error and keep going.
    fn write(&self, state: &QueriedState) -> IndexerResult<()>;
}

/// Sink overwriting a single JSON file.
///
/// No locking: two sinks on the same path race.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableSink for JsonFileSink {
    fn write(&self, state: &QueriedState) -> IndexerResult<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| IndexerError::sink("Failed to serialize state", Some(Box::new(e))))?;

        fs::write(&self.path, json).map_err(|e| {
            IndexerError::sink(
                format!("Failed to write {}", self.path.display()),
                Some(Box::new(e)),
            )
        })?;

        info!(path = %self.path.display(), events = state.len(), "Snapshot written");
        Ok(())
    }
}

/// Create `dir` (and parents) unless it already exists.
///
/// # Errors
///
/// Returns a configuration error if the directory cannot be created or the
/// path exists but is not a directory.
pub fn ensure_directory<P: AsRef<Path>>(dir: P) -> IndexerResult<()> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(IndexerError::config(
            format!("{} exists but is not a directory", dir.display()),
            None,
        ));
    }

    fs::create_dir_all(dir).map_err(|e| {
        IndexerError::config(
            format!("Error creating {}", dir.display()),
            Some(Box::new(e)),
        )
    })?;
    info!(dir = %dir.display(), "Created dump directory");
    Ok(())
}
