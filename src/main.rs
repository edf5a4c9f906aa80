use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pressing_checkout::application::dispatcher::NotificationDispatcher;
use pressing_checkout::config::CheckoutConfig;
use pressing_checkout::domain::ports::DraftStoreBox;
use pressing_checkout::infrastructure::channels::default_channels;
use pressing_checkout::infrastructure::in_memory::{InMemoryDraftStore, InMemoryOrderApi};
#[cfg(feature = "storage-rocksdb")]
use pressing_checkout::infrastructure::rocksdb::RocksDBDraftStore;
use pressing_checkout::infrastructure::sandbox::SandboxProvider;
use pressing_checkout::interfaces::batch::BatchRunner;
use pressing_checkout::interfaces::csv::checkout_reader::CheckoutReader;
use pressing_checkout::interfaces::csv::outcome_writer::OutcomeWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input checkouts CSV file
    input: PathBuf,

    /// Path to persistent draft storage (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Cap on retries per session
    #[arg(long)]
    max_retries: Option<u32>,

    /// Interval between verification polls, for every terminal screen
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// How long a pending transaction is polled before it counts as timed out
    #[arg(long)]
    poll_deadline_secs: Option<u64>,
}

impl Cli {
    fn config(&self) -> CheckoutConfig {
        let mut config = CheckoutConfig::from_env();
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll = config.poll.with_uniform_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = self.poll_deadline_secs {
            config.poll.deadline = Duration::from_secs(secs);
        }
        config
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<DraftStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBDraftStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryDraftStore::new()))
        }
        None => Ok(Box::new(InMemoryDraftStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let store = open_store(cli.db_path.clone())?;

    let dispatcher =
        NotificationDispatcher::new(config.channel_timeout).with_channels(default_channels());
    let runner = BatchRunner::new(
        Arc::new(SandboxProvider::new()),
        Arc::new(InMemoryOrderApi::new()),
        Arc::new(dispatcher),
        store,
        config,
    );

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CheckoutReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for request in reader.checkouts() {
        match request {
            Ok(request) => {
                let report = runner.run(request).await.into_diagnostic()?;
                writer.write(&report).into_diagnostic()?;
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable checkout row");
            }
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
