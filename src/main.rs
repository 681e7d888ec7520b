//! Mempool strike agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     AGENT                            │
//!                 │                                                      │
//!  WSS stream ────┼─▶ watcher ──▶ queue ──▶ pipeline ──▶ trigger ──┐     │
//!                 │                              │                 ▼     │
//!                 │                              │            TxIssuer ──┼──▶ broadcast
//!  Operator  ─────┼─▶ http (withdraw / status) ──┼─────────────▲   │     │
//!                 │                              ▼                 ▼     │
//!                 │                     FailoverProvider ◀── AccountState│
//!                 │                     (endpoint pool)      (nonce)     │
//!                 │                                                      │
//!                 │  boot · health probes · heartbeat · metrics · logs   │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;

use mempool_agent::blockchain::Wallet;
use mempool_agent::config::{load_config, loader::CONFIG_PATH_ENV_VAR};
use mempool_agent::health::HealthMonitor;
use mempool_agent::lifecycle::{shutdown_signal, BootSequencer, Shutdown};
use mempool_agent::observability;
use mempool_agent::provider::FailoverProvider;
use mempool_agent::resilience::RetryPolicy;
use mempool_agent::watcher::{
    CandidatePipeline, CandidateQueue, HasRecipient, MempoolWatcher, WatcherState,
};
use mempool_agent::{AgentContext, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "mempool-agent", version, about = "Mempool strike agent")]
struct Args {
    /// Optional TOML config file (falls back to $AGENT_CONFIG).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config_path = args
        .config
        .or_else(|| std::env::var(CONFIG_PATH_ENV_VAR).ok().map(PathBuf::from));
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            observability::init_tracing(&Default::default());
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    observability::init_tracing(&config.observability);
    tracing::info!("mempool-agent v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_id = config.chain.chain_id,
        pool_size = config.endpoints.pool.len(),
        quorum = config.endpoints.quorum,
        stream = %observability::redact_url(&config.watcher.ws_url),
        "Configuration loaded"
    );

    // Key material is not a transient failure; refuse to start without it.
    let wallet = Wallet::from_env(config.chain.chain_id)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let provider = Arc::new(FailoverProvider::from_config(&config.endpoints));
    let shutdown = Shutdown::new();

    let boot = BootSequencer::new(RetryPolicy::from(&config.boot.retry));
    let report = tokio::select! {
        report = boot.run(&provider, wallet.address()) => report,
        _ = shutdown_signal() => {
            tracing::info!("Shutdown requested during boot");
            return Ok(());
        }
    };
    let account = report.into_account(wallet.address());

    let queue = Arc::new(CandidateQueue::new(config.watcher.queue_capacity));
    let watcher = config.watcher.enabled.then(|| {
        MempoolWatcher::new(
            config.watcher.ws_url.clone(),
            RetryPolicy::from(&config.watcher.reconnect),
            queue.clone(),
        )
    });
    let watcher_state = match &watcher {
        Some(w) => w.subscribe_state(),
        None => watch::channel(WatcherState::Disconnected).1,
    };

    let ctx = AgentContext::new(
        config.clone(),
        provider.clone(),
        account,
        wallet,
        watcher_state,
    );

    let monitor = HealthMonitor::new(
        provider.clone(),
        Duration::from_secs(config.endpoints.probe_interval_secs),
    );
    tokio::spawn(monitor.run(shutdown.subscribe()));

    let reporter = ctx.reporter.clone();
    let heartbeat_rx = shutdown.subscribe();
    tokio::spawn(async move { reporter.run(heartbeat_rx).await });

    match watcher {
        Some(watcher) => {
            let pipeline = CandidatePipeline::new(
                queue,
                provider.clone(),
                ctx.issuer.clone(),
                Arc::new(HasRecipient),
                config.watcher.max_inflight_fetches,
            );
            tokio::spawn(pipeline.run(shutdown.subscribe()));
            tokio::spawn(watcher.run(shutdown.subscribe()));
        }
        None => tracing::info!("Mempool watcher disabled"),
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, status = "HUNTING", "Agent ready");

    let server = HttpServer::new(ctx);
    let server_rx = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_rx));

    shutdown_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
