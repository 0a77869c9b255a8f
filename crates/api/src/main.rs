use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keychain_core::generator::KeychainGenerator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keychain_api::background;
use keychain_api::config::ServerConfig;
use keychain_api::router::build_app_router;
use keychain_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "keychain_api=debug,keychain_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Working directories ---
    config
        .layout
        .ensure_dirs()
        .await
        .expect("Failed to create working directories");
    tracing::info!(
        uploads = %config.layout.uploads_dir.display(),
        cache = %config.layout.cache_dir.display(),
        preview = %config.layout.preview_dir.display(),
        "Working directories ready"
    );

    // --- Generator ---
    let kernel = config.kernel.build_kernel();
    tracing::info!(program = kernel.program(), "Using external CAD kernel");
    let generator = Arc::new(KeychainGenerator::new(&config.layout, Arc::new(kernel)));

    // --- Retention sweeper ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::retention::run(
        config.retention_policy(),
        config.sweep_interval(),
        sweep_cancel.clone(),
    ));

    // --- App state + router ---
    let state = AppState {
        config: Arc::new(config.clone()),
        generator,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(timeout, sweep_handle).await.is_err() {
        tracing::warn!("Retention job did not stop in time");
    } else {
        tracing::info!("Retention job stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
