//! zbxbridge gateway
//!
//! - Trapper listener: Zabbix sender protocol over TCP, one request per connection
//! - Scrape listener: `/metrics` in Prometheus text format, `/healthz`
//! - Catalog and config are validated before either listener is bound

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;

use zbxbridge_core::error::{BridgeError, Result};
use zbxbridge_gateway::{app_state::AppState, config, logging, router, transport};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = config::Cli::parse();

    let cfg = match cli.load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("zbxbridge-gateway: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&cfg.log) {
        eprintln!("zbxbridge-gateway: {e}");
        return ExitCode::FAILURE;
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "zbxbridge-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: config::BridgeConfig) -> Result<()> {
    let state = AppState::from_config(cfg)?;
    let trapper_addr = state.cfg().server.socket_addr()?;
    let scrape_addr = state.cfg().metrics.socket_addr()?;
    tracing::info!(
        file = %state.cfg().metrics.file,
        metrics = state.registry().len(),
        "metric catalog loaded"
    );
    if !state.allowlist().is_empty() {
        tracing::info!(allowed = ?state.cfg().server.allowed_clients, "client allow-list active");
    }

    let trapper = TcpListener::bind(trapper_addr)
        .await
        .map_err(|e| BridgeError::Io(format!("bind {trapper_addr} failed: {e}")))?;
    let scrape = TcpListener::bind(scrape_addr)
        .await
        .map_err(|e| BridgeError::Io(format!("bind {scrape_addr} failed: {e}")))?;
    tracing::info!(%trapper_addr, %scrape_addr, "zbxbridge-gateway starting");

    let (stop_tx, stop_rx) = watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(());
    });

    let app = router::build_router(state.clone());
    let scrape_stop = stop_rx.clone();
    let scrape_task = tokio::spawn(async move {
        axum::serve(scrape, app)
            .with_graceful_shutdown(stopped(scrape_stop))
            .await
    });

    transport::serve(trapper, state, stopped(stop_rx)).await;

    match scrape_task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(BridgeError::Io(format!("metrics server failed: {e}"))),
        Err(e) => Err(BridgeError::Io(format!("metrics server task failed: {e}"))),
    }
}

async fn stopped(mut rx: watch::Receiver<()>) {
    let _ = rx.changed().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
