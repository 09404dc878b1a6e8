//! Structured logging setup.
//!
//! Logging goes through `tracing`. The binary installs a subscriber once at
//! startup with [`init_tracing`]; library code only emits events and spans.
//!
//! # Environment Configuration
//!
//! ```bash
//! # Everything at debug
//! RUST_LOG=debug ens-event-indexer scan
//!
//! # Quiet down the transport while tracing retries
//! RUST_LOG=ens_event_indexer::retry=debug,alloy=warn ens-event-indexer scan
//!
//! # JSON console output plus a daily-rotated JSON file
//! LOG_JSON=true LOG_FILE=./logs/indexer.log ens-event-indexer subscribe
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{IndexerError, IndexerResult};

/// Filter used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_FILTER: &str = "ens_event_indexer=info,warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level`; with neither set, [`DEFAULT_FILTER`]
/// applies. Console output is pretty unless `json_output` is set. When
/// `log_file` is given, a JSON layer writes to a daily-rotated file next to
/// it.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns a configuration error if the log directory cannot be created or a
/// global subscriber is already installed.
pub fn init_tracing(
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    json_output: bool,
) -> IndexerResult<Option<WorkerGuard>> {
    let env_filter = match (std::env::var("RUST_LOG"), log_level) {
        (Ok(filter), _) => EnvFilter::new(filter),
        (Err(_), Some(level)) => EnvFilter::new(level),
        (Err(_), None) => EnvFilter::new(DEFAULT_FILTER),
    };

    let console_layer = if json_output {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let (file_layer, guard) = match log_file.as_deref() {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir).map_err(|e| {
                IndexerError::config(
                    format!("Cannot create log directory {}", dir.display()),
                    Some(Box::new(e)),
                )
            })?;

            let appender = tracing_appender::rolling::daily(
                dir,
                path.file_name().unwrap_or_else(|| OsStr::new("indexer.log")),
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| IndexerError::config("Tracing already initialized", Some(Box::new(e))))?;

    info!(
        json_output,
        file_logging = log_file.is_some(),
        "Tracing initialized"
    );

    Ok(guard)
}

/// Install a debug-level subscriber writing to the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Run with `cargo test -- --nocapture` to see the output.
pub fn init_test_tracing() {
    use tracing_subscriber::fmt::format::FmtSpan;

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("ens_event_indexer=debug"))
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
