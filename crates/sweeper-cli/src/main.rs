//! sweeper - time-partitioned directory retention
//!
//! Scans `<root>/<tenant>/<device>/YYYY/MM/DD/HH/MM`, deletes minute
//! directories once their tenant's retention has passed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use sweeper_core::codec::PathSchema;
use sweeper_core::impls::{DeleteMode, DryRunBackend, FsDeletionBackend, FsScanSource};
use sweeper_core::ports::DeletionBackend;
use sweeper_core::queue::RetryPolicy;
use sweeper_core::{RetentionPolicy, SweeperBuilder, SweeperConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root of the tenant/device/time tree
    #[arg(short, long)]
    root: PathBuf,

    /// Retention table (JSON, days per tenant plus "default")
    #[arg(short, long)]
    config: PathBuf,

    /// Log what would be deleted without touching the filesystem
    #[arg(long)]
    dry_run: bool,

    /// Seconds between processing due directories
    #[arg(long, default_value_t = 5)]
    tick_interval: u64,

    /// Seconds between rescans for new directories
    #[arg(long, default_value_t = 300)]
    rescan_interval: u64,

    /// Seconds before retrying a directory that was not yet empty
    #[arg(long, default_value_t = 60)]
    retry_delay: u64,

    /// Retries per directory before giving up (0 disables the count cap;
    /// then --max-retry-age is required)
    #[arg(long, default_value_t = RetryPolicy::DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Give up once a directory has been retried for this many seconds
    #[arg(long)]
    max_retry_age: Option<u64>,

    /// Tree has no device level: <root>/<tenant>/YYYY/MM/DD/HH/MM
    #[arg(long)]
    no_device_level: bool,

    /// Only handle this tenant
    #[arg(long)]
    tenant: Option<String>,

    /// Maximum deletes per second
    #[arg(long)]
    delete_rate: Option<u32>,

    /// Concurrent delete calls per tick
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Log scan progress every N directories (0 disables)
    #[arg(long, default_value_t = SweeperConfig::DEFAULT_LOG_EVERY)]
    log_every: usize,

    /// Remove up to N empty parent directories after each delete (max 4)
    #[arg(long, default_value_t = 0)]
    prune_parents: usize,

    /// Remove minute directories together with their contents
    #[arg(long)]
    recursive: bool,

    /// Scan once, delete what is due, exit
    #[arg(long)]
    once: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn sweeper_config(&self) -> SweeperConfig {
        let schema = if self.no_device_level {
            PathSchema::without_device()
        } else {
            PathSchema::with_device()
        };

        SweeperConfig {
            schema,
            tick_interval: Duration::from_secs(self.tick_interval),
            rescan_interval: Duration::from_secs(self.rescan_interval),
            retry: RetryPolicy {
                delay: Duration::from_secs(self.retry_delay),
                max_retries: (self.max_retries > 0).then_some(self.max_retries),
                max_age: self.max_retry_age.map(Duration::from_secs),
            },
            only_tenant: self.tenant.clone(),
            delete_rate_per_sec: self.delete_rate,
            prune_parent_levels: self.prune_parents,
            delete_concurrency: self.workers,
            log_every: self.log_every,
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let policy = RetentionPolicy::load(&args.config)
        .with_context(|| format!("Failed to load retention config {}", args.config.display()))?;
    tracing::info!(
        default_days = policy.default_days(),
        overrides = policy.len(),
        "retention policy loaded"
    );

    let config = args.sweeper_config();

    // 相対パスや `..` を含む root をここで解決する（codec は末尾の成分しか見ない）
    let root = std::fs::canonicalize(&args.root)
        .with_context(|| format!("Failed to resolve root {}", args.root.display()))?;
    let mut source = FsScanSource::new(root, config.schema);
    if let Some(tenant) = &args.tenant {
        source = source.only_tenant(tenant.clone());
    }

    let backend: Arc<dyn DeletionBackend> = if args.dry_run {
        tracing::info!("DRY RUN mode: nothing will be deleted");
        Arc::new(DryRunBackend)
    } else if args.recursive {
        Arc::new(FsDeletionBackend::new(DeleteMode::Recursive))
    } else {
        Arc::new(FsDeletionBackend::new(DeleteMode::EmptyOnly))
    };

    tracing::info!(
        root = %source.root().display(),
        dry_run = args.dry_run,
        once = args.once,
        workers = args.workers,
        "starting sweeper"
    );

    let sweeper = SweeperBuilder::new(policy)
        .source(Arc::new(source))
        .backend(backend)
        .config(config)
        .build()
        .context("Failed to build sweeper")?;

    if args.once {
        let counts = sweeper.run_once().await;
        println!(
            "{}",
            serde_json::to_string_pretty(&counts).context("Failed to encode summary")?
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(sweeper.run(shutdown_rx));

    wait_for_shutdown_signal().await?;
    // receiver may already be gone if the loop ended on its own
    let _ = shutdown_tx.send(true);

    let counts = run.await.context("Sweeper task failed")?;
    tracing::info!(
        deleted = counts.deleted,
        already_gone = counts.already_gone,
        failed = counts.failed,
        given_up = counts.given_up,
        still_tracked = counts.tracked,
        "shutdown complete"
    );
    Ok(())
}
