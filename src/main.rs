//! CLI entry point for the ENS registrar event indexer.
//!
//! ```text
//! main.rs (runtime + tracing)
//!     ↓
//! CLI Layer (src/cli.rs)
//!     ↓
//! scan:      Config → connect → per batch: scanner → chunk → retry → sink
//! subscribe: Config → connect → subscriber → terminal
//! ```

use ens_event_indexer::{cli, observability};
use tracing::error;

/// Entry point.
///
/// Logging is controlled by `RUST_LOG`, `LOG_JSON` and `LOG_FILE`:
///
/// ```bash
/// RUST_LOG=debug ens-event-indexer scan
/// LOG_JSON=true LOG_FILE=./logs/indexer.log ens-event-indexer subscribe
/// ```
#[tokio::main]
async fn main() {
    let log_level = std::env::var("RUST_LOG").ok();
    let log_file = std::env::var("LOG_FILE").ok().map(std::path::PathBuf::from);
    let json_output = std::env::var("LOG_JSON")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    // Held until exit so buffered file logs are flushed
    let log_guard = match observability::init_tracing(log_level, log_file, json_output) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize tracing: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run().await {
        error!(error = %e, "Application error");
        eprintln!("Error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
