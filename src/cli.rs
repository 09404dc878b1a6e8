//! Command-line interface for the ENS registrar event indexer.
//!
//! # Commands
//!
//! - `scan`: Query a historical block range and dump events to JSON
//! - `subscribe`: Print registrar events as they are emitted
//!
//! # Example
//!
//! ```bash
//! # Scan START_BLOCK_HEIGHT..=END_BLOCK_HEIGHT, asking before each batch
//! ens-event-indexer scan
//!
//! # Non-interactive scan of an explicit range
//! ens-event-indexer scan --yes --from-block 9380380 --to-block 9390380
//!
//! # Follow new events
//! ens-event-indexer subscribe
//! ```

use std::io::{self, BufRead, Write};

use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::WrapErr;
use tracing::{error, info, warn};

use crate::config::{BatchConfig, Config};
use crate::error::IndexerResult;
use crate::normalize::CapturedEvent;
use crate::rpc::{check_connection, connect, AlloyLogSource};
use crate::scanner::scan;
use crate::sink::{ensure_directory, JsonFileSink};
use crate::subscriber::subscribe;

/// ENS .eth registrar event indexer
#[derive(Parser, Debug)]
#[command(name = "ens-event-indexer")]
#[command(about = "Chunked, retrying event indexer for the ENS .eth registrar", long_about = None)]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a block range and write every batch to the dump directory
    Scan {
        /// Run every batch without prompting
        #[arg(short, long)]
        yes: bool,

        /// First block to scan (overrides START_BLOCK_HEIGHT)
        #[arg(long)]
        from_block: Option<u64>,

        /// Last block to scan (overrides END_BLOCK_HEIGHT)
        #[arg(long)]
        to_block: Option<u64>,
    },

    /// Print live NameRegistered, NameRenewed and Transfer events
    Subscribe,
}

/// Operator answer at the per-batch gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    /// Scan this batch.
    Run,
    /// Skip to the next batch.
    Skip,
    /// Stop; no further batches run.
    End,
}

impl BatchDecision {
    /// Interpret a prompt answer. Anything but `run` or `skip` ends the scan.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "run" => Self::Run,
            "skip" => Self::Skip,
            _ => Self::End,
        }
    }
}

/// Parse CLI arguments and execute the appropriate command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the node cannot be
/// reached. Failures inside a batch are reported and do not end the run.
pub async fn run() -> IndexerResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            yes,
            from_block,
            to_block,
        } => run_scan_command(yes, from_block, to_block).await,
        Commands::Subscribe => run_subscribe_command().await,
    }
}

/// Execute the scan command.
async fn run_scan_command(
    yes: bool,
    from_block: Option<u64>,
    to_block: Option<u64>,
) -> IndexerResult<()> {
    let config = Config::from_env()?.with_bounds(from_block, to_block);
    let range = config.scan_range()?;
    info!(start = range.start(), end = range.end(), "Scan range validated");

    ensure_directory(config.dump_directory())?;

    let provider = connect(config.rpc_url()).await?;
    let head = check_connection(&provider).await?;
    if range.end() > head {
        warn!(end = range.end(), head, "Scan range extends past the chain head");
    }
    let source = AlloyLogSource::new(provider);

    println!("{}", "⏳⏳⏳ Start scanning...".cyan().bold());
    println!();

    let decide = move |batch: &BatchConfig| {
        println!("{} Starting {}...", "⏳⏳".cyan(), batch.name().bold());

        let decision = if yes {
            BatchDecision::Run
        } else {
            prompt_batch_decision().unwrap_or_else(|e| {
                error!(error = %e, "Batch prompt failed");
                BatchDecision::End
            })
        };

        match decision {
            BatchDecision::Run => println!("{} Running this section", "👍".green()),
            BatchDecision::Skip => {
                println!("{} Skipping this section", "👍".yellow());
                println!();
            }
            BatchDecision::End => println!("{} Ending script", "❌".red()),
        }
        decision
    };

    for batch in gate_batches(config.batches(), decide) {
        run_batch(&config, batch, &source).await;
    }

    Ok(())
}

/// Batches the operator chose to run, in order.
///
/// `decide` is asked once per batch, lazily, so a prompt for the next batch
/// only appears after the previous one has been consumed. `Skip` passes over
/// a batch and `End` stops before it; later batches are never asked about.
pub fn gate_batches<'a, F>(
    batches: &'a [BatchConfig],
    mut decide: F,
) -> impl Iterator<Item = &'a BatchConfig>
where
    F: FnMut(&BatchConfig) -> BatchDecision,
{
    batches
        .iter()
        .map(move |batch| (batch, decide(batch)))
        .take_while(|(_, decision)| *decision != BatchDecision::End)
        .filter(|(_, decision)| *decision == BatchDecision::Run)
        .map(|(batch, _)| batch)
}

/// Scan one batch, reporting the outcome on the terminal.
async fn run_batch(config: &Config, batch: &BatchConfig, source: &AlloyLogSource) {
    let path = config.dump_directory().join(batch.file_name());
    let sink = JsonFileSink::new(&path);

    let result = async {
        let range = config.scan_range()?;
        let window = config.window(batch)?;
        scan(
            source,
            range,
            &window,
            &config.specs(batch),
            &config.retry_policy(),
            &sink,
        )
        .await
    }
    .await;

    match result {
        Ok(state) => {
            println!(
                "{} {} complete: {} events written to {}",
                "✅".green(),
                batch.name(),
                state.len().to_string().yellow(),
                path.display()
            );
            println!();
        }
        Err(e) => {
            error!(batch = batch.name(), error = %e, "Batch failed");
            println!("{} {} failed: {}", "🚨".red(), batch.name(), e);
            println!();
        }
    }
}

/// Ask the operator whether to run the next batch.
fn prompt_batch_decision() -> IndexerResult<BatchDecision> {
    print!("❓ Type 'run', 'skip', or 'end': ");
    io::stdout().flush().wrap_err("Failed to flush prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .wrap_err("Failed to read batch confirmation")?;

    let decision = BatchDecision::parse(&answer);
    if decision == BatchDecision::End && !matches!(answer.trim(), "end") {
        println!("{} Invalid response, ending by default", "🚨".red());
    }
    Ok(decision)
}

/// Execute the subscribe command.
async fn run_subscribe_command() -> IndexerResult<()> {
    let config = Config::from_env()?;

    let provider = connect(config.rpc_url()).await?;
    check_connection(&provider).await?;
    let source = AlloyLogSource::new(provider);
    let specs = config.all_specs();

    println!("{}", "⏳⏳⏳ Start subscribing...".cyan().bold());
    println!();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => {
            info!("Shutdown signal received");
            println!();
            println!("{}", "👋 Subscription stopped".green().bold());
        }
        stats = subscribe(&source, &specs, |event| print_event(&event)) => {
            let stats = stats?;
            warn!(forwarded = stats.forwarded, "All subscriptions ended");
            println!("{}", "Subscriptions closed by the node".yellow());
        }
    }

    Ok(())
}

/// Display one live event.
fn print_event(event: &CapturedEvent) {
    println!("{} {}", "tx hash     :".dimmed(), event.tx_hash());
    println!("{} {}", "event       :".dimmed(), event.kind().to_string().cyan().bold());
    println!("{} {}", "tokenId     :".dimmed(), event.token_id());
    match event {
        CapturedEvent::NameRegistered { owner, expires, .. } => {
            println!("{} {}", "owner       :".dimmed(), owner.blue());
            println!("{} {}", "expires     :".dimmed(), format_expiry(*expires));
        }
        CapturedEvent::NameRenewed { expires, .. } => {
            println!("{} {}", "expires     :".dimmed(), format_expiry(*expires));
        }
        CapturedEvent::Transfer { from, to, .. } => {
            println!("{} {}", "from        :".dimmed(), from.blue());
            println!("{} {}", "to          :".dimmed(), to.magenta());
        }
    }
    println!("{} {}", "blockheight :".dimmed(), event.block().to_string().yellow());
    println!("{}", "--------------------".dimmed());
}

/// Render an expiry timestamp as `seconds (UTC date)`.
fn format_expiry(expires: u64) -> String {
    i64::try_from(expires)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || expires.to_string(),
            |date| format!("{expires} ({})", date.format("%Y-%m-%d %H:%M:%S UTC")),
        )
}
