use clap::Parser;
use deviceshot::{server, AppState, DeviceCatalog, FrameCompositor, ServiceConfig};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::parse();
    let catalog = DeviceCatalog::builtin()?;

    // Missing frames only fail the requests that need them.
    for id in catalog.ids() {
        if let Some(profile) = catalog.lookup(id) {
            let path = config.assets.join(&profile.image_uri);
            if !path.is_file() {
                warn!("frame asset for '{}' not found at {}", id, path.display());
            }
        }
    }

    let renderer = deviceshot::new_renderer(config.capture_config())?;
    let compositor = Arc::new(FrameCompositor::new(&config.assets));
    let state = AppState::new(catalog, renderer, compositor);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Server is running at http://{}", listener.local_addr()?);

    server::serve(listener, state, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
