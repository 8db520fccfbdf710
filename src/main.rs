mod config;
mod dispatcher;
mod error;
mod fetcher;
mod format;
mod image_cache;
mod intent;
mod keywords;
mod messages;
mod platform;
mod records;
mod server;
mod store;
mod time_bucket;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::fetcher::Fetcher;
use crate::image_cache::{ImageCache, ImageHost, ImgurHost};
use crate::platform::Platform;
use crate::server::AppState;
use crate::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,weatherbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Webhook: {}", config.server.webhook_path);
    info!("  Database: {}", config.storage.database_path.display());

    let store = Store::open(&config.storage.database_path)?;
    let fetcher = Fetcher::new(config.sources.clone());

    let host: Option<Arc<dyn ImageHost>> = match &config.imgur {
        Some(imgur) => Some(Arc::new(ImgurHost::new(imgur.clone()))),
        None => {
            warn!("No [imgur] section configured; image replies fall back to source URLs");
            None
        }
    };
    let images = ImageCache::new(store.clone(), fetcher.clone(), host);

    let platform = Platform::from_config(&config);
    info!("Platform: {}", platform.kind);
    let dispatcher = Dispatcher::new(fetcher, images, store, platform.replier.clone());
    let state = Arc::new(AppState {
        webhook: platform.webhook.clone(),
        dispatcher,
    });

    let app = server::router(state, &config.server.webhook_path);
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Bot is starting...");
    server::serve(listener, app).await
}
