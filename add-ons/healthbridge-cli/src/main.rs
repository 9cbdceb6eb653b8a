//! HealthBridge terminal front end.
//!
//! Loads config, opens local storage, runs the onboarding gate, then reads one
//! command per line until `quit` or CTRL-C.

mod shell;

use healthbridge_core::{
    AiServices, AppState, Coordinates, DeniedGeolocator, FixedGeolocator, Geolocator, HealthBridgeConfig,
    KeyValueBackend, MemoryBackend, PersistentStore, SledBackend,
};
use shell::{Flow, Shell};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[healthbridge] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = HealthBridgeConfig::load()?;
    let backend: Arc<dyn KeyValueBackend> = if config.uses_memory_storage() {
        tracing::warn!("storage_backend = memory; nothing will survive a restart");
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(SledBackend::open_in(&config.storage_path)?)
    };
    let store = PersistentStore::new(backend, config.key_prefix.clone());
    let state = AppState::open(store.clone()).into_shared();

    let ai = AiServices::from_config(&config);
    let geo: Arc<dyn Geolocator> = match config.default_position() {
        Some((latitude, longitude)) => Arc::new(FixedGeolocator(Coordinates { latitude, longitude })),
        None => Arc::new(DeniedGeolocator),
    };

    tracing::info!(
        app = %config.app_name,
        storage_path = %config.storage_path,
        storage_backend = %config.storage_backend,
        llm_mode = %config.llm_mode,
        "HealthBridge started"
    );

    let mut shell = Shell::new(&config, Arc::clone(&state), ai, geo);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    shell.greet().await;
    loop {
        shell.prompt();
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if shell.handle(&line).await == Flow::Quit {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    shell.close();
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "final flush failed");
    }
    Ok(())
}
