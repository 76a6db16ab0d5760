// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use cmxsafe_controller::{
    cluster::KubeCluster,
    config::ControllerArgs,
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    dispatcher::Dispatcher,
    http, tetragon,
    watch::run_watch,
};
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{runtime::watcher, Api, Client};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("cmxsafe-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Format: timestamp file:line LEVEL message
    // RUST_LOG overrides the default INFO filter, RUST_LOG_FORMAT=json switches output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
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

    let args = ControllerArgs::parse();
    info!("Starting cmxsafe controller");
    debug!(?args, "Configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let cluster = Arc::new(KubeCluster::new(client.clone()));
    let ctx = Arc::new(Context::new(cluster, args.reconcile_config()));

    let pods = Api::<Pod>::namespaced(client.clone(), &args.pod_namespace);
    let pod_config = watcher::Config::default().labels(&args.pod_label_selector);
    let services = Api::<Service>::all(client);

    let signature = args.signature();
    let events = tetragon::subscribe(&args.tetragon_socket, signature.filter()).await?;
    info!(socket = %args.tetragon_socket.display(), "Subscribed to Tetragon events");
    let dispatcher = Dispatcher::new(ctx.clone(), signature, args.dump_events);

    // None of these tasks should return; any exit takes the process down
    tokio::select! {
        result = run_watch(pods, pod_config, ctx.pods.clone(), "pod") => {
            error!("CRITICAL: Pod watch exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Pod watch exited unexpectedly without error")
        }
        result = run_watch(services, watcher::Config::default(), ctx.services.clone(), "service") => {
            error!("CRITICAL: Service watch exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Service watch exited unexpectedly without error")
        }
        result = dispatcher.run(events) => {
            error!("CRITICAL: Tetragon event stream ended: {:?}", result);
            result?;
            anyhow::bail!("Tetragon event stream ended without error")
        }
        result = http::serve(args.metrics_address, shutdown_signal()) => {
            error!("CRITICAL: Metrics server exited: {:?}", result);
            result?;
            Ok(())
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
