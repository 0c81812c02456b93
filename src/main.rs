//! Library Catalog API server
//! Mission: Authenticate readers and serve the book catalog behind role gates

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_catalog::{
    auth::SqliteIdentityStore, books::BookStore, create_router, AppState, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = Config::parse();
    config.validate()?;

    info!("🚀 Library Catalog starting");

    if config.uses_dev_secret() {
        warn!("⚠️  JWT_SECRET not set, using the development key. CHANGE IT IN PRODUCTION!");
    }

    let identity_store = Arc::new(
        SqliteIdentityStore::new(&config.auth_db_path).context("Failed to open identity store")?,
    );
    info!("🔐 Identity store initialized at: {}", config.auth_db_path);

    let book_store =
        Arc::new(BookStore::new(&config.catalog_db_path).context("Failed to open book store")?);
    info!("📚 Catalog initialized at: {}", config.catalog_db_path);

    // Signing key is read once here and never changes afterwards
    let token_config = config.token_config();
    info!(
        "🎟️  Tokens expire after {}h",
        token_config.expiration_hours
    );

    let state = AppState::new(
        identity_store,
        book_store,
        &token_config,
        config.external_delay(),
    );
    let app = create_router(state);

    // Start server
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("🎯 API server listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
