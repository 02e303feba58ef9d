use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use classreg::config::{AppConfig, StoreConfig};
use classreg::server::create_router;
use classreg::store::{MemoryStore, RestStore, StoreBackend};
use classreg::sync::{PropagationJournal, SyncEngine};
use classreg::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_file(&PathBuf::from(&path))
            .with_context(|| format!("loading config {path}"))?,
        None => AppConfig::default(),
    };

    let store = match &config.store {
        StoreConfig::Memory => {
            info!("using in-memory document store");
            StoreBackend::Memory(MemoryStore::new())
        }
        StoreConfig::Rest { base_url } => {
            info!(base_url = %base_url, "using remote document store");
            StoreBackend::Rest(RestStore::new(base_url)?)
        }
    };

    let journal = Arc::new(match &config.journal_path {
        Some(path) => PropagationJournal::open(path)
            .with_context(|| format!("opening journal {}", path.display()))?,
        None => PropagationJournal::in_memory()?,
    });

    let engine = SyncEngine::with_config(store, journal, config.engine_config());
    let state = Arc::new(AppState { engine });

    // Background reconciliation pass for outstanding propagations.
    let reconcile_state = state.clone();
    let interval = Duration::from_secs(config.reconcile_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let settled = reconcile_state.engine.reconcile().await;
            if settled > 0 {
                info!(settled, "reconciliation pass settled outstanding propagations");
            }
        }
    });

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(address = %config.bind_address, "classreg listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not install ctrl-c handler");
    }
    info!("shutdown signal received");
}
