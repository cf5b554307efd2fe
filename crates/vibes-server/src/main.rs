//! # vibes-server
//!
//! HTTP backend for the GoodVibes gallery:
//! - **Document API** over SQLite for website entries and user profiles
//! - **File storage** for uploaded thumbnails
//! - **Screenshot proxy** that keeps the upstream API key server-side
//! - **Admin API** for creating admin profiles
//! - **Per-IP rate limiting** on writes and the proxy

mod api;
mod blob_store;
mod config;
mod error;
mod rate_limit;
mod thumbnail;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use vibes_store::Database;

use crate::api::AppState;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::thumbnail::ThumbnailProxy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vibes_server=debug")),
        )
        .init();

    info!("Starting vibes server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        admin_enabled = config.admin_token.is_some(),
        screenshots_enabled = config.thumbnail_api_key.is_some(),
        "Instance settings"
    );

    let database = match config.database_path {
        Some(ref path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?database.path(), "Database opened");

    let blob_store = Arc::new(
        BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size).await?,
    );

    let thumbnails = Arc::new(ThumbnailProxy::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?,
        config.thumbnail_api_base.clone(),
        config.thumbnail_api_key.clone(),
    ));

    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(database)),
        blob_store,
        thumbnails,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config),
    };

    // Evict buckets idle for 10 minutes, every 5 minutes
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let purged = rate_limiter.purge_idle(Duration::from_secs(600));
            if purged > 0 {
                tracing::debug!(purged, "Purged idle rate-limit buckets");
            }
        }
    });

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
