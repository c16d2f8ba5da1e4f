use parkpulse::store::ParkingStore;
use parkpulse::{api, config};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level());
    tracing::info!(
        app = %config.app.name,
        config_path = config::DEFAULT_CONFIG_PATH,
        "parking service starting"
    );

    let store = Arc::new(RwLock::new(ParkingStore::service_dataset()));
    {
        let guard = store.read().map_err(|_| parkpulse::error::AppError::StateLock)?;
        tracing::info!(
            lots = guard.lots().len(),
            places = guard.places().len(),
            "Service dataset seeded"
        );
    }

    let app = api::router(Arc::clone(&store));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
