// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};
use vault_operator::{
    config::OperatorConfig,
    constants::TOKIO_WORKER_THREADS,
    context::{Context, KubeSecretStore},
    crd::{AppRole, AuthMethod, Policy, UserPass, VaultSecret},
    resource_controller::{run_resource_controller, run_vault_server_controller},
    server::{run_metrics_server, Readiness},
    vault::HttpClientFactory,
};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(TOKIO_WORKER_THREADS);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("vault-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // Respects RUST_LOG, defaulting to INFO, and RUST_LOG_FORMAT=json|text
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
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

async fn async_main() -> Result<()> {
    init_tracing();

    info!("Starting Vault operator");
    let config = OperatorConfig::from_env();
    debug!(?config, "Loaded configuration");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let context = Arc::new(Context {
        client: client.clone(),
        vault_factory: Arc::new(HttpClientFactory),
        secrets: Arc::new(KubeSecretStore::new(client)),
        config: config.clone(),
    });

    let readiness = Readiness::default();

    info!("Starting all controllers");
    readiness.set_ready();

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_vault_server_controller(context.clone()) => {
            error!("CRITICAL: VaultServer controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("VaultServer controller exited unexpectedly without error")
        }
        result = run_resource_controller::<VaultSecret>(context.clone()) => {
            error!("CRITICAL: Secret controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Secret controller exited unexpectedly without error")
        }
        result = run_resource_controller::<Policy>(context.clone()) => {
            error!("CRITICAL: Policy controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Policy controller exited unexpectedly without error")
        }
        result = run_resource_controller::<AuthMethod>(context.clone()) => {
            error!("CRITICAL: AuthMethod controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("AuthMethod controller exited unexpectedly without error")
        }
        result = run_resource_controller::<UserPass>(context.clone()) => {
            error!("CRITICAL: UserPass controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("UserPass controller exited unexpectedly without error")
        }
        result = run_resource_controller::<AppRole>(context.clone()) => {
            error!("CRITICAL: AppRole controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("AppRole controller exited unexpectedly without error")
        }
        result = run_metrics_server(&config.metrics_bind_address, readiness.clone()) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        signal = shutdown_signal() => {
            info!("Received {}, shutting down", signal?);
            Ok(())
        }
    }
}
