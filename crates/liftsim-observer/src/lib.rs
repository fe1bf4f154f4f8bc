//! Observer API server for the liftsim elevator engine.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Building and call endpoints**: create buildings, place calls, set
//!   destinations, list a building's calls
//! - **Elevator reads** (`GET /api/elevators/{id}`) served from the
//!   latest snapshot the scheduler published
//! - **`WebSocket` stream** (`/ws/elevators/{id}`) of one elevator's
//!   snapshots via [`tokio::sync::broadcast`]
//! - **Operator endpoints** for pause, resume, speed, status, and stop
//!
//! # Architecture
//!
//! Writes go straight to the [`EntityStore`](liftsim_db::EntityStore);
//! the scheduler picks them up on its next tick. The scheduler publishes
//! through [`BroadcastNotifier`], which updates the latest-snapshot map
//! and feeds connected `WebSocket` clients, so reads never wait on a
//! tick.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::spawn_observer;
pub use state::{AppState, BroadcastNotifier};
