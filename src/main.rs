//! Graceful shutdown demo.
//!
//! Starts a few simulated services, each owning a terminate signal with
//! cleanup callbacks, then waits for SIGINT/SIGTERM/SIGQUIT and closes them
//! under the configured policy.
//!
//! ```text
//! graceful-demo --entities 3 --policy force-sync --raise-after 2
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use graceful_shutdown::config::{load_config, ShutdownConfig};
use graceful_shutdown::observability::init_logging;
use graceful_shutdown::{wait_for_signals, ClosePolicy, StopContext, TerminateSignal};

#[derive(Parser)]
#[command(name = "graceful-demo")]
#[command(about = "Closes simulated services gracefully on a termination signal", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Close policy: async, sync or force-sync (overrides config).
    #[arg(short, long)]
    policy: Option<ClosePolicy>,

    /// Number of terminate signals to create.
    #[arg(short, long, default_value_t = 1)]
    entities: usize,

    /// Deliver SIGINT to this process after the given number of seconds.
    #[arg(long)]
    raise_after: Option<u64>,

    /// Stop-context deadline per terminate signal in milliseconds (overrides config).
    #[arg(long)]
    timeout_ms: Option<u64>,
}

/// Simulated database: closing flushes asynchronously.
struct Database {
    id: usize,
}

impl Database {
    async fn close(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tracing::info!(entity = self.id, "Database closed");
    }
}

/// Simulated HTTP listener.
struct Listener {
    id: usize,
    served: AtomicU64,
}

impl Listener {
    fn shutdown(&self) {
        tracing::info!(
            entity = self.id,
            served = self.served.load(Ordering::Relaxed),
            "Listener shut down"
        );
    }
}

/// Simulated cache.
struct Cache {
    id: usize,
}

impl Cache {
    fn terminate(&self) {
        tracing::info!(entity = self.id, "Cache terminated");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShutdownConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    init_logging(&config.logging)?;

    tracing::info!(
        policy = %config.policy,
        signals = ?config.signals,
        entities = cli.entities,
        timeout_ms = config.timeout_ms,
        "graceful-demo starting"
    );

    let signals: Vec<TerminateSignal> = (0..cli.entities)
        .map(|id| start_service(id, config.timeout()))
        .collect();

    if let Some(secs) = cli.raise_after {
        schedule_interrupt(Duration::from_secs(secs));
    }

    wait_for_signals(&config.signals, config.policy, &signals).await;

    tracing::info!("Shutdown gracefully");
    Ok(())
}

/// Build one service with its terminate signal and a worker loop bound to the stop context.
fn start_service(id: usize, timeout: Option<Duration>) -> TerminateSignal {
    let signal = TerminateSignal::with_timeout(timeout).named(format!("service-{id}"));

    let database = Arc::new(Database { id });
    let listener = Arc::new(Listener {
        id,
        served: AtomicU64::new(0),
    });
    let cache = Arc::new(Cache { id });

    signal.register_async_callback(move || async move { database.close().await });
    {
        let listener = listener.clone();
        signal.register_callback(move || listener.shutdown());
    }
    signal.register_callback(move || cache.terminate());

    tokio::spawn(serve(id, listener, signal.stop_context()));
    signal
}

async fn serve(id: usize, listener: Arc<Listener>, stop: StopContext) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                listener.served.fetch_add(1, Ordering::Relaxed);
            }
            _ = stop.cancelled() => {
                tracing::info!(entity = id, reason = ?stop.err(), "Worker loop stopping");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn schedule_interrupt(after: Duration) {
    use nix::sys::signal::{raise, Signal};

    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        tracing::info!("Raising SIGINT");
        if let Err(e) = raise(Signal::SIGINT) {
            tracing::error!(error = %e, "Failed to raise SIGINT");
        }
    });
}

#[cfg(not(unix))]
fn schedule_interrupt(_after: Duration) {
    tracing::warn!("--raise-after is only supported on Unix; press ctrl-c instead");
}
