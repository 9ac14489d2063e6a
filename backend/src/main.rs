use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::broadcast::BroadcastHub;
use crate::config::ServerConfig;
use crate::games::backend_wheel_game::create_router as create_wheel_game_router;
use crate::games::spin_coordinator::{SpinCoordinator, SpinTimings};
use crate::services::restaurant_service::create_router as create_restaurant_router;
use crate::shutdown::ShutdownSignal;
use crate::storage::Storage;

mod broadcast;
mod config;
mod error;
mod games;
mod handlers;
mod logging;
mod models;
mod services;
mod shutdown;
mod storage;
#[cfg(test)]
mod test_support;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub hub: Arc<BroadcastHub>,
    pub coordinator: SpinCoordinator,
    pub shutdown: ShutdownSignal,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, timings: SpinTimings, shutdown: ShutdownSignal) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let coordinator = SpinCoordinator::new(storage.clone(), hub.clone(), timings, shutdown.clone());
        Self {
            storage,
            hub,
            coordinator,
            shutdown,
        }
    }
}

fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/health_check", get(handlers::health_check))
        .merge(create_wheel_game_router())
        .merge(create_restaurant_router());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    // Displays and the admin page are a single-page app; unknown paths get index.html.
    let index = config.static_dir.join("index.html");
    let cache_control_layer =
        SetResponseHeaderLayer::if_not_present(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    let frontend = cache_control_layer.layer(ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(handlers::ws_handler))
        .nest_service("/uploads", ServeDir::new(state.storage.uploads_dir()))
        .fallback_service(frontend)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = ServerConfig::from_env();
    let storage = Arc::new(Storage::open(&config.data_dir).await?);
    let (shutdown_tx, shutdown) = shutdown::channel();
    let state = AppState::new(storage, config.timings, shutdown);

    // Background sweep that frees a spin lock whose unlock timer was lost
    let sweep = state.coordinator.spawn_stale_lock_sweep(config.lock_sweep);

    let app = build_router(state, &config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("🎡 Lucky wheel listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("🛑 Shutdown requested"),
                Err(e) => {
                    error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            }
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = sweep.await {
        error!("Spin lock sweep ended abnormally: {}", e);
    }
    info!("Server stopped");
    Ok(())
}
