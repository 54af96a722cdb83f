//! ZapShift HTTP server.

use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use zapshift::{AppState, Config, Resources, app, metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    init_tracing();
    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "Failed to read .env file");
        }
    }

    info!("Starting ZapShift HTTP Server");

    let config = Config::from_env();
    info!(
        store = ?config.store.backend,
        database = %config.store.database,
        payments = ?config.payments.backend,
        allowed_origins = config.checkout.allowed_origins.len(),
        fail_open_reads = config.policy.fail_open_reads,
        "Configuration loaded"
    );

    if let Some(port) = config.server.metrics_port {
        spawn_metrics_server(&config.server.host, port).await?;
    }
    metrics::register_business_metrics();

    let resources = Resources::from_config(&config).await?;
    let state = AppState::new(resources.stores, resources.gateway, resources.clock, &config);
    let router = app(state, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    // Run server with graceful shutdown, bounded once the signal arrives
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            info!("Server stopped");
            return Ok(());
        }
        _ = signalled_rx => {}
    }

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => result??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout,
            "Graceful shutdown timed out, dropping open connections"
        ),
    }

    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,zapshift=debug,tower_http=info,mongodb=warn".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Installs the Prometheus recorder and serves `/metrics` on its own port.
async fn spawn_metrics_server(host: &str, port: u16) -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let metrics_app = Router::new().route("/metrics", get(move || async move { handle.render() }));

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Prometheus metrics available at /metrics");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, metrics_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!(error = %err, "Metrics server error");
        }
    });
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
