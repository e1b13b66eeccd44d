use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use pairs_quant::alert::AlertHistory;
use pairs_quant::binance::ws::BinanceWsClient;
use pairs_quant::config::{Config, LoggingConfig};
use pairs_quant::ingest::{FlushScheduler, TickBuffer, TickSink};
use pairs_quant::pipeline::{PairAnalytics, RefreshReport, RefreshRequest};
use pairs_quant::store::SqliteTickStore;

const TICK_BUFFER_CAPACITY: usize = 4_096;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&logging.file, logging.json) {
        (Some(path), json) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path))?;
            let builder = builder.with_writer(log_file).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        (None, true) => builder.json().init(),
        (None, false) => builder.init(),
    }
    Ok(())
}

fn log_report(req: &RefreshRequest, report: &RefreshReport) {
    let summary = report.summary();
    tracing::info!(
        pair = %format!("{}/{}", req.leg_a(), req.leg_b()),
        status = ?report.status,
        bars_a = report.bars_a.len(),
        bars_b = report.bars_b.len(),
        beta = ?summary.beta,
        zscore = ?summary.latest_zscore,
        correlation = ?summary.latest_correlation,
        "Pair analytics refreshed"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install rustls crypto provider");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set PQ_CONFIG_PATH or create config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging)?;

    let request = config.refresh_request()?;
    tracing::info!(
        symbols = ?request.symbols,
        ws_url = %config.binance.ws_base_url,
        db_path = %config.storage.db_path,
        "Starting pairs-quant"
    );

    let buffer = Arc::new(TickBuffer::with_capacity(TICK_BUFFER_CAPACITY));
    let store = Arc::new(
        SqliteTickStore::open(Path::new(&config.storage.db_path))
            .with_context(|| format!("failed to open {}", config.storage.db_path))?,
    );
    let history = Arc::new(AlertHistory::new(config.analytics.alert_policy));
    let analytics = Arc::new(PairAnalytics::new(store.clone(), history.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Feed -> buffer
    let ws_client = BinanceWsClient::new(&config.binance.ws_base_url, &request.symbols);
    let sink: Arc<dyn TickSink> = buffer.clone();
    let feed_shutdown = shutdown_rx.clone();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = ws_client.connect_and_run(sink, feed_shutdown).await {
            tracing::error!(error = %format!("{:#}", e), "Feed task failed");
        }
    });

    // Buffer -> store
    let flusher = FlushScheduler::new(buffer.clone(), store.clone(), config.storage.flush_interval());
    let flush_task = tokio::spawn(flusher.run(shutdown_rx.clone()));

    // Store -> analytics -> alerts
    let refresh_interval = config.analytics.refresh_interval();
    let mut refresh_shutdown = shutdown_rx.clone();
    let refresh_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let worker = analytics.clone();
                    let req = request.clone();
                    match tokio::task::spawn_blocking(move || worker.refresh(&req)).await {
                        Ok(Ok(report)) => log_report(&request, &report),
                        Ok(Err(e)) => tracing::warn!(error = %e, "Refresh failed"),
                        Err(e) => tracing::warn!(error = %e, "Refresh task aborted"),
                    }
                }
                _ = refresh_shutdown.changed() => {
                    tracing::info!("Refresh loop shutting down");
                    break;
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    tracing::info!("Ctrl+C received");
    let _ = shutdown_tx.send(true);

    let _ = feed_task.await;
    let _ = refresh_task.await;
    match flush_task.await {
        Ok(stats) => tracing::info!(?stats, "Flush totals"),
        Err(e) => tracing::warn!(error = %e, "Flush task join failed"),
    }
    tracing::info!(alerts = history.len(), rows = ?store.count().ok(), "Shutdown complete");
    Ok(())
}
