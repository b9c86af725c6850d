//! HTTP surface over a simulated geofence controller.

mod handlers;
mod state;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use state::{AppState, SimController};

pub fn build_router(controller: SimController) -> Router {
    let state = Arc::new(AppState {
        controller: Mutex::new(controller),
    });

    Router::new()
        .route("/api/geofences", get(handlers::list_geofences).post(handlers::add_geofence))
        .route("/api/geofences/{id}", delete(handlers::remove_geofence))
        .route("/api/location", post(handlers::update_location))
        .route("/api/notifications", get(handlers::notifications))
        .route("/api/stop", post(handlers::stop_all))
        .route("/api/resume", post(handlers::resume))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, controller: SimController) -> std::io::Result<()> {
    let app = build_router(controller);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("region monitor listening on http://{}", addr);
    info!("press Ctrl+C to stop");

    axum::serve(listener, app).await
}
