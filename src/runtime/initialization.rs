//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, Kubernetes client setup and reconciler wiring.

use crate::config::{self, ServerConfig};
use crate::controller::reconciler::{KubeStore, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::ChuckNorris;
use crate::observability;
use crate::provider::ChuckNorrisClient;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for the ChuckNorris CRD, scoped to the watched namespace(s)
    pub resources: Api<ChuckNorris>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Background task running the HTTP server
    pub server_handle: JoinHandle<()>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn initialize() -> Result<InitializationResult> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    init_tracing();

    info!("Starting ChuckNorris Controller v{}", env!("CARGO_PKG_VERSION"));

    let (controller_config, server_config) = config::load_config();
    info!(
        joke_api_url = %controller_config.joke_api_url,
        watch_namespace = controller_config.watch_namespace.as_deref().unwrap_or("<all>"),
        max_concurrent_reconciles = controller_config.max_concurrent_reconciles,
        metrics_port = server_config.metrics_port,
        "Loaded configuration"
    );

    observability::metrics::register_metrics()?;

    // Cancelled on shutdown: stops the HTTP server and aborts in-flight fetches
    let shutdown = CancellationToken::new();

    let server_state = Arc::new(ServerState::default());
    let server_handle = {
        let state = Arc::clone(&server_state);
        let token = shutdown.clone();
        let port = server_config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state, token).await {
                error!("HTTP server error: {:#}", e);
            }
        })
    };

    // Wait for the server so readiness probes pass before reconciling starts
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let resources: Api<ChuckNorris> = match controller_config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let provider = Arc::new(ChuckNorrisClient::new(
        &controller_config.joke_api_url,
        controller_config.fetch_timeout(),
    )?);
    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler {
        shutdown,
        ..Reconciler::new(store, provider, controller_config)
    });

    log_existing_resources(&resources).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        resources,
        reconciler,
        server_state,
        server_handle,
    })
}

/// Install the tracing subscriber, honouring `RUST_LOG`
fn init_tracing() {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chucknorris_controller=info".into()),
        )
        .try_init()
    {
        // Already initialized, e.g. when embedded in tests
        warn!("Tracing subscriber init returned error (may already be initialized): {}", e);
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log a per-namespace summary of existing resources
///
/// Also checks the CRD is installed; the controller keeps going either way and the
/// watch retries.
async fn log_existing_resources(resources: &Api<ChuckNorris>) {
    match resources.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
                    .or_default()
                    .push(item.name_any());
            }

            info!(
                "CRD is queryable, found {} existing ChuckNorris resources in {} namespace(s)",
                list.items.len(),
                by_namespace.len()
            );
            for (namespace, mut names) in by_namespace {
                names.sort();
                info!("Namespace {}: {}", namespace, names.join(", "));
            }
        }
        Err(e) => {
            error!("CRD is not queryable; {}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
