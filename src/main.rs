use anyhow::{Context, Result};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use models::category::UploadPolicy;
use services::{flash_service::FlashSigner, upload_service::UploadService};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting upload-sorter with config: {:?}", cfg);

    // --- Ensure upload folders exist ---
    let uploads = UploadService::new(&cfg.upload_dir, UploadPolicy::default());
    uploads
        .init_folders()
        .await
        .with_context(|| format!("creating upload folders under {}", cfg.upload_dir))?;
    tracing::info!(
        "Upload folders ready under {} (allowed: {})",
        uploads.base_path.display(),
        uploads.policy.describe()
    );

    // --- Flash signing key ---
    let flash = match cfg.secret_key.as_deref() {
        Some(secret) => FlashSigner::new(secret)?,
        None => {
            tracing::warn!(
                "No secret key configured (UPLOAD_SORTER_SECRET_KEY); using a random key, \
                 pending flash messages will not survive a restart"
            );
            FlashSigner::random()?
        }
    };

    // --- Build router ---
    let app = routes::routes::app(AppState { uploads, flash });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => {
            tracing::warn!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
