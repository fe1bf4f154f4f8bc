//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use liftsim_db::EntityStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// See [`handlers`] and [`operator`] for the endpoint tables. The
/// `WebSocket` stream is `GET /ws/elevators/{id}`.
///
/// CORS is configured to allow any origin for development.
pub fn build_router<S: EntityStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::<S>))
        // WebSocket
        .route("/ws/elevators/{id}", get(ws::ws_elevator::<S>))
        // Buildings and calls
        .route(
            "/api/buildings",
            get(handlers::list_buildings::<S>).post(handlers::create_building::<S>),
        )
        .route("/api/buildings/{id}", get(handlers::get_building::<S>))
        .route(
            "/api/buildings/{id}/calls",
            get(handlers::list_building_calls::<S>),
        )
        .route("/api/calls", post(handlers::create_call::<S>))
        .route(
            "/api/calls/{id}/destination",
            put(handlers::set_destination::<S>),
        )
        .route("/api/elevators/{id}", get(handlers::get_elevator::<S>))
        // Operator
        .route("/api/operator/pause", post(operator::pause::<S>))
        .route("/api/operator/resume", post(operator::resume::<S>))
        .route("/api/operator/speed", post(operator::set_speed::<S>))
        .route("/api/operator/status", get(operator::status::<S>))
        .route("/api/operator/stop", post(operator::stop::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
