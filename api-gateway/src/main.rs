//! API gateway entry point.
//!
//! See [`api_gateway::config`] for the environment variables it reads.

use std::sync::Arc;

use anyhow::{Context, Result};
use api_gateway::{
    config::{GatewayConfig, StoreBackend},
    router,
    secrets::SecretsClient,
    AppState,
};
use song_ingest::{FanoutFaultSink, FaultSink, TracingFaultSink};
use song_store::{InMemorySongStore, PgSongStore};
use tracing::{info, warn};

async fn build_state(config: &GatewayConfig) -> Result<AppState> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("using in-memory song store; nothing is persisted");
            Ok(AppState {
                store: Arc::new(InMemorySongStore::new()),
                faults: Arc::new(TracingFaultSink),
            })
        }
        StoreBackend::Postgres => {
            let database_url = SecretsClient::from_env()
                .get_secret(&config.database_secret_id, "DATABASE_URL")
                .await?;
            let store = PgSongStore::connect(&database_url, config.database_max_connections)
                .await
                .context("connecting song store")?;
            if config.run_migrations {
                store.migrate().await.context("preparing song store schema")?;
            }
            let store = Arc::new(store);

            let mut sinks: Vec<Arc<dyn FaultSink>> = vec![Arc::new(TracingFaultSink)];
            if config.persist_faults {
                sinks.push(store.clone());
            }
            Ok(AppState {
                store,
                faults: Arc::new(FanoutFaultSink::new(sinks)),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_gateway=info".parse()?)
                .add_directive("song_ingest=info".parse()?)
                .add_directive("song_store=info".parse()?),
        )
        .json()
        .init();

    let config = GatewayConfig::from_env()?;
    info!(backend = ?config.backend, "starting api gateway");

    let state = Arc::new(build_state(&config).await?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "api gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
