// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use ingress_dns::{
    cli::Args,
    cluster::{build_client, resolve_kubeconfig_path},
    ingress_watcher::{check_ingress_access, IngressWatcher},
    metrics_server,
    record_store::RecordStore,
    server::DnsServer,
};
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("ingress-dns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

/// Whether `RUST_LOG_FORMAT` asks for JSON output.
fn is_json_log_format(value: &str) -> bool {
    value.eq_ignore_ascii_case("json")
}

fn init_logging() {
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=ingress_dns=debug ingress-dns
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json ingress-dns
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    if is_json_log_format(&log_format) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_ansi(true)
            .compact()
            .init();
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting ingress-dns");
    debug!(?args, "Parsed command line");

    // Startup: every failure below is fatal and happens before serving begins
    let kubeconfig = resolve_kubeconfig_path(args.kubeconfig.clone());
    let client = build_client(kubeconfig.as_deref()).await.map_err(|e| {
        error!("Failed to initialize Kubernetes client: {e}");
        e
    })?;
    debug!("Kubernetes client initialized successfully");

    check_ingress_access(&client).await.map_err(|e| {
        error!("Cannot watch Ingresses: {e}");
        e
    })?;

    let store = RecordStore::new();

    let server = DnsServer::bind(args.dns_addr(), store.clone())
        .await
        .map_err(|e| {
            error!("{e}");
            e
        })?;

    let metrics_listener = match args.metrics_addr {
        Some(addr) => Some(metrics_server::bind(addr).await.map_err(|e| {
            error!("{e}");
            e
        })?),
        None => None,
    };

    // Steady state: the watcher runs on its own task so that its failure
    // leaves the server answering from the last known records.
    let watcher = IngressWatcher::new(store.clone(), args.target_address);
    let watcher_task = tokio::spawn(watcher.run(client));
    let watcher_abort = watcher_task.abort_handle();

    let monitor_store = store.clone();
    let watcher_monitor = async move {
        match watcher_task.await {
            Ok(()) => error!("CRITICAL: Ingress watcher exited unexpectedly"),
            Err(e) => error!("CRITICAL: Ingress watcher task failed: {e}"),
        }
        warn!(
            records = monitor_store.len(),
            "Continuing to serve the last known records without updates"
        );
        std::future::pending::<()>().await;
    };

    let metrics_future = async move {
        match metrics_listener {
            Some(listener) => metrics_server::serve(listener, store).await,
            None => std::future::pending().await,
        }
    };

    info!("ingress-dns ready");

    let result = tokio::select! {
        () = server.run() => {
            Err(anyhow::anyhow!("DNS server loop exited unexpectedly"))
        }
        () = watcher_monitor => {
            Err(anyhow::anyhow!("Ingress watcher monitor exited unexpectedly"))
        }
        result = metrics_future => {
            error!("Metrics endpoint exited: {:?}", result);
            result.map_err(anyhow::Error::from)
        }
        result = shutdown_signal() => {
            info!("Shutdown signal received, stopping");
            result
        }
    };

    watcher_abort.abort();
    result
}

/// Resolve once SIGINT (or SIGTERM on Unix) is received.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
